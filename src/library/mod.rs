//! Library discovery.
//! A library is a storage root with an apps directory; the primary library
//! receives every relocated cache category.

mod descriptor;
mod resolve;

use std::fmt;
use std::path::{Path, PathBuf};

pub use descriptor::{parse_library_paths, DescriptorError};
pub use resolve::{resolve_libraries, resolve_primary};

/// Apps directory inside every library.
pub const APPS_ROOT: &str = "steamapps";
/// Library descriptor listing secondary roots, inside the primary apps directory.
pub const DESCRIPTOR_NAME: &str = "libraryfolders.vdf";

/// Relocatable cache categories, fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    ShaderCache,
    CompatData,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::ShaderCache, Category::CompatData];

    /// Directory name under the apps root; also the manifest spelling.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::ShaderCache => "shadercache",
            Category::CompatData => "compatdata",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.dir_name() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    /// Canonical absolute root.
    pub path: PathBuf,
    pub is_primary: bool,
}

impl Library {
    pub fn new(path: impl Into<PathBuf>, is_primary: bool) -> Self {
        Self {
            path: path.into(),
            is_primary,
        }
    }

    pub fn apps_dir(&self) -> PathBuf {
        apps_dir(&self.path)
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        category_dir(&self.path, category)
    }
}

pub fn apps_dir(root: &Path) -> PathBuf {
    root.join(APPS_ROOT)
}

pub fn category_dir(root: &Path, category: Category) -> PathBuf {
    apps_dir(root).join(category.dir_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::parse(c.dir_name()), Some(c));
        }
        assert_eq!(Category::parse("downloading"), None);
    }

    #[test]
    fn category_dir_layout() {
        let lib = Library::new("/games/b", false);
        assert_eq!(
            lib.category_dir(Category::ShaderCache),
            PathBuf::from("/games/b/steamapps/shadercache")
        );
    }
}
