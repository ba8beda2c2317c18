//! Authentication state trait.

use crate::session::SessionService;
use crate::store::CredentialStore;

/// Trait for state types that can verify credentials.
pub trait HasSessionBackend {
    type Store: CredentialStore;

    fn sessions(&self) -> &SessionService<Self::Store>;
}
