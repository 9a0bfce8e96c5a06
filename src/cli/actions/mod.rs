pub mod server;

use secrecy::SecretString;

use crate::auth::state::AppConfig;
use crate::store::StoreBackend;

/// Actions the CLI can dispatch to.
pub enum Action {
    Server {
        port: u16,
        backend: StoreBackend,
        dsn: Option<SecretString>,
        config: AppConfig,
    },
}
