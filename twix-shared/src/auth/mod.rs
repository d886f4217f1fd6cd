/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: access/refresh token issuance and validation
/// - [`principal`]: bearer header → authenticated [`principal::Principal`]
/// - [`policy`]: declarative rules evaluated before every mutation
///
/// # Example
///
/// ```no_run
/// use twix_shared::auth::jwt::issue_pair;
/// use twix_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("tw1x-rocks")?;
/// assert!(verify_password("tw1x-rocks", &hash)?);
///
/// let tokens = issue_pair(Uuid::new_v4(), "a-secret-of-at-least-thirty-two-bytes!")?;
/// println!("{}", tokens.access_token);
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod password;
pub mod policy;
pub mod principal;
