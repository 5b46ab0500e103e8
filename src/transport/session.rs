//! Login and game connection pair.
//!
//! A client talks to the login server first, then hands over to a game
//! server; only one of the two is expected to be live at a time. Both
//! connections share one length table and one filter chain.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::config::NetworkConfig;
use crate::core::length_table::LengthTable;
use crate::error::constants::ERR_DEAD_SOCKET;
use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::PacketHandler;
use crate::protocol::filter::FilterChain;
use crate::transport::connection::Connection;

pub const LOGIN_CONNECTION: &str = "login";
pub const GAME_CONNECTION: &str = "game";

pub struct ClientSession {
    login: Connection,
    game: Connection,
    filters: Arc<FilterChain>,
    lengths: Arc<dyn LengthTable>,
    config: NetworkConfig,
}

impl ClientSession {
    pub fn new(config: NetworkConfig, lengths: Arc<dyn LengthTable>) -> Self {
        let filters = Arc::new(FilterChain::new());
        let login = Connection::new(
            LOGIN_CONNECTION,
            &config,
            Arc::clone(&lengths),
            Arc::clone(&filters),
        );
        let game = Connection::new(
            GAME_CONNECTION,
            &config,
            Arc::clone(&lengths),
            Arc::clone(&filters),
        );

        Self {
            login,
            game,
            filters,
            lengths,
            config,
        }
    }

    pub fn login(&self) -> &Connection {
        &self.login
    }

    pub fn login_mut(&mut self) -> &mut Connection {
        &mut self.login
    }

    pub fn game(&self) -> &Connection {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Connection {
        &mut self.game
    }

    pub fn filters(&self) -> &Arc<FilterChain> {
        &self.filters
    }

    pub fn lengths(&self) -> &Arc<dyn LengthTable> {
        &self.lengths
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Connect to the configured login endpoint.
    pub async fn connect_login(&mut self) -> Result<()> {
        let (host, port) = self.config.client.login_endpoint()?;
        self.login.connect(&host, port).await
    }

    /// Close the login link and connect to a game server.
    ///
    /// With `compressed` set, everything the game server sends is run
    /// through the decompressor, starting with its first byte.
    #[instrument(skip(self))]
    pub async fn connect_game(&mut self, host: &str, port: u16, compressed: bool) -> Result<()> {
        self.login.disconnect().await;
        self.game.connect_with(host, port, compressed).await?;
        info!(host, port, compressed, "Switched to game server");
        Ok(())
    }

    pub async fn disconnect(&mut self) {
        self.login.disconnect().await;
        self.game.disconnect().await;
    }

    /// Drain both connections into `handler`, login first.
    pub fn update<H>(&mut self, handler: &mut H) -> usize
    where
        H: PacketHandler + ?Sized,
    {
        self.login.update(handler) + self.game.update(handler)
    }

    /// Queue `data` as if it had arrived on whichever connection is live.
    ///
    /// The game link wins when only it is up; the login link is used when the
    /// game link is down.
    pub fn inject(&self, data: Vec<u8>) -> Result<()> {
        if !self.login.is_connected() && self.game.is_connected() {
            self.game.injector().inject(data)
        } else if !self.game.is_connected() && self.login.is_connected() {
            self.login.injector().inject(data)
        } else {
            error!("{}", ERR_DEAD_SOCKET);
            Err(ProtocolError::NotConnected)
        }
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("login", &self.login)
            .field("game", &self.game)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_without_links() {
        let session = ClientSession::new(NetworkConfig::default(), Arc::new(|_: u8| -1i16));
        assert!(matches!(
            session.inject(vec![0xBF, 0x00, 0x03]),
            Err(ProtocolError::NotConnected)
        ));
    }

    #[test]
    fn test_connections_share_filters() {
        let session = ClientSession::new(NetworkConfig::default(), Arc::new(|_: u8| -1i16));
        assert!(Arc::ptr_eq(session.login().filters(), session.game().filters()));
        assert_eq!(session.login().name(), LOGIN_CONNECTION);
        assert_eq!(session.game().name(), GAME_CONNECTION);
    }
}
