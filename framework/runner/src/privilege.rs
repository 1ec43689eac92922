use nix::unistd::geteuid;

use crate::run::RunError;

/// Realtime priorities (`cyclictest -p99`) and memory locking need root.
pub(crate) fn check_privileges() -> Result<(), RunError> {
    let euid = geteuid();
    if euid.is_root() {
        Ok(())
    } else {
        Err(RunError::Unprivileged(euid.as_raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_effective_uid() {
        let result = check_privileges();
        if geteuid().is_root() {
            assert!(result.is_ok());
        } else {
            assert!(matches!(result, Err(RunError::Unprivileged(uid)) if uid == geteuid().as_raw()));
        }
    }
}
