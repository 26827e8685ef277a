pub mod gate;
pub mod middleware;
pub mod password;
pub mod token;

pub use gate::{role_gate, RoleGate};
pub use middleware::{optional_auth, require_auth, CurrentUser, MaybeUser, Verifier};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService};
