//! Timestamps: the epoch-seconds values stored in directory entries, and
//! rendering them for display.

use std::time::{SystemTime, UNIX_EPOCH};

/// The current time as Unix epoch seconds, the unit directory entries store
/// their three timestamps in.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Renders `unix_time` the way the original tool's `unixTimeToString` does:
/// a fixed-width `ctime`-shaped string (`"Thu Jan  1 00:00:00 1970"`) with
/// no trailing newline. Uses `libc::localtime_r`/`strftime` rather than a
/// time-formatting crate, since nothing in the dependency graph pulls one
/// in for any other purpose.
pub fn format_local(unix_time: u64) -> String {
    unsafe {
        let time = unix_time as libc::time_t;
        let mut tm: libc::tm = std::mem::zeroed();
        libc::localtime_r(&time, &mut tm);

        let mut buf = [0u8; 32];
        let format = b"%a %b %e %H:%M:%S %Y\0";
        let len = libc::strftime(
            buf.as_mut_ptr() as *mut libc::c_char,
            buf.len(),
            format.as_ptr() as *const libc::c_char,
            &tm,
        );
        String::from_utf8_lossy(&buf[..len]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_local_epoch_zero() {
        let s = format_local(0);
        assert!(s.ends_with("1970"));
        assert!(!s.contains('\n'));
    }

    #[test]
    fn now_unix_is_plausible() {
        let t = now_unix();
        assert!(t > 1_700_000_000);
    }
}
