//! Admin password gate for commands that modify the store.

use sha2::{Digest, Sha256};

/// Check a supplied admin password against the configured one.
///
/// Both sides are hashed first so the comparison always covers 32 bytes.
pub fn verify_admin(configured: Option<&str>, supplied: Option<&str>) -> anyhow::Result<()> {
    let Some(configured) = configured.filter(|p| !p.is_empty()) else {
        anyhow::bail!("Admin commands are disabled: no admin password is configured (ROOMS_ADMIN_PASSWORD)");
    };
    let Some(supplied) = supplied else {
        anyhow::bail!("This command requires the admin password (--password or ROOMS_PASSWORD)");
    };

    let expected = Sha256::digest(configured.as_bytes());
    let actual = Sha256::digest(supplied.as_bytes());
    let diff = expected
        .iter()
        .zip(actual.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    if diff != 0 {
        anyhow::bail!("Incorrect password");
    }
    Ok(())
}
