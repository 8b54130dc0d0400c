//! Metadata carried over when an entry has to be copied instead of renamed.
//! Timestamps always; permission bits on Unix.

use anyhow::Result;
use filetime::{set_file_times, FileTime};
use std::fs;
use std::path::Path;

pub(super) fn preserve_metadata(src_meta: &fs::Metadata, dest: &Path) -> Result<()> {
    let at = FileTime::from_last_access_time(src_meta);
    let mt = FileTime::from_last_modification_time(src_meta);
    set_file_times(dest, at, mt)
        .map_err(|e| anyhow::anyhow!("set times on {}: {}", dest.display(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = src_meta.permissions().mode() & 0o7777;
        fs::set_permissions(dest, fs::Permissions::from_mode(mode))
            .map_err(|e| anyhow::anyhow!("set mode on {}: {}", dest.display(), e))?;
    }

    Ok(())
}
