//! Filesystem usage via `statvfs`.

use std::path::Path;

use nix::sys::statvfs::statvfs;

use crate::error::{Error, Result};
use crate::snapshot::{DataDiskUsage, RootDiskUsage};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Raw block counts of a filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCounts {
    pub block_size: u64,
    pub fragment_size: u64,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_available: u64,
}

impl BlockCounts {
    /// Query the filesystem containing `path`.
    pub fn query(path: &Path) -> Result<Self> {
        let stat = statvfs(path).map_err(|source| Error::Statvfs {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Self {
            block_size: stat.block_size() as u64,
            fragment_size: stat.fragment_size() as u64,
            blocks: stat.blocks() as u64,
            blocks_free: stat.blocks_free() as u64,
            blocks_available: stat.blocks_available() as u64,
        })
    }

    /// Usage in bytes, with `used` excluding root-reserved blocks from the
    /// free space and `percent` relative to the space usable by unprivileged users.
    pub fn data_usage(&self) -> DataDiskUsage {
        let total = self.blocks * self.fragment_size;
        let free_for_root = self.blocks_free * self.fragment_size;
        let free = self.blocks_available * self.fragment_size;
        let used = total.saturating_sub(free_for_root);
        let usable = used + free;

        let percent = if usable > 0 {
            ((used as f64 / usable as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        };

        DataDiskUsage {
            free,
            total,
            used,
            percent,
        }
    }

    /// Usage in GiB, counting root-reserved blocks as available.
    pub fn root_usage(&self) -> RootDiskUsage {
        let to_gib = |blocks: u64| (blocks * self.block_size) as f64 / BYTES_PER_GIB;

        RootDiskUsage {
            total: to_gib(self.blocks),
            used: to_gib(self.blocks.saturating_sub(self.blocks_free)),
            available: to_gib(self.blocks_free),
        }
    }
}

/// Usage of the data partition holding `path`.
pub fn data_disk_usage(path: &Path) -> Result<DataDiskUsage> {
    Ok(BlockCounts::query(path)?.data_usage())
}

/// Usage of the root partition holding `path`.
pub fn root_disk_usage(path: &Path) -> Result<RootDiskUsage> {
    Ok(BlockCounts::query(path)?.root_usage())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> BlockCounts {
        BlockCounts {
            block_size: 4096,
            fragment_size: 4096,
            blocks: 1_000_000,
            blocks_free: 300_000,
            blocks_available: 250_000,
        }
    }

    #[test]
    fn test_data_usage() {
        let usage = counts().data_usage();

        assert_eq!(usage.total, 4_096_000_000);
        assert_eq!(usage.free, 1_024_000_000);
        assert_eq!(usage.used, 2_867_200_000);
        // 700k used of 950k usable blocks
        assert_eq!(usage.percent, 73.7);
    }

    #[test]
    fn test_data_usage_empty_filesystem() {
        let usage = BlockCounts {
            block_size: 4096,
            fragment_size: 4096,
            blocks: 0,
            blocks_free: 0,
            blocks_available: 0,
        }
        .data_usage();

        assert_eq!(usage.total, 0);
        assert_eq!(usage.percent, 0.0);
    }

    #[test]
    fn test_root_usage_gib() {
        let usage = BlockCounts {
            block_size: 1024 * 1024,
            fragment_size: 1024 * 1024,
            blocks: 30 * 1024,
            blocks_free: 20 * 1024,
            blocks_available: 19 * 1024,
        }
        .root_usage();

        assert_eq!(usage.total, 30.0);
        assert_eq!(usage.used, 10.0);
        assert_eq!(usage.available, 20.0);
    }

    #[test]
    fn test_query_real_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let usage = data_disk_usage(dir.path()).unwrap();

        assert!(usage.total > 0);
        assert!(usage.used <= usage.total);
        assert!((0.0..=100.0).contains(&usage.percent));
    }

    #[test]
    fn test_query_missing_path() {
        let result = data_disk_usage(Path::new("/definitely/not/a/mount/point"));
        assert!(matches!(result, Err(Error::Statvfs { .. })));
    }
}
