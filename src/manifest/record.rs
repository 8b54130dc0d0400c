//! Manifest line format.
//!
//! One record per line, four tab-separated fields:
//! `library<TAB>category<TAB>0|1<TAB>item-list-id`. The id is empty when no
//! items were moved. Library paths are stored as raw bytes on Unix.

use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::library::Category;
use crate::platform::{os_from_bytes, os_to_bytes};

const ID_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub library: PathBuf,
    pub category: Category,
    pub items_moved: bool,
    pub item_list_id: Option<String>,
}

impl ActionRecord {
    /// A category that was empty and only needed a redirect.
    pub fn linked_empty(library: impl Into<PathBuf>, category: Category) -> Self {
        Self {
            library: library.into(),
            category,
            items_moved: false,
            item_list_id: None,
        }
    }

    /// A populated category whose entries are listed under `item_list_id(library, category)`.
    pub fn linked_populated(library: impl Into<PathBuf>, category: Category) -> Self {
        let library = library.into();
        let id = item_list_id(&library, category);
        Self {
            library,
            category,
            items_moved: true,
            item_list_id: Some(id),
        }
    }

    pub fn same_pair(&self, library: &Path, category: Category) -> bool {
        self.library == library && self.category == category
    }

    pub fn to_line(&self) -> Vec<u8> {
        let mut line = os_to_bytes(self.library.as_os_str());
        line.push(b'\t');
        line.extend_from_slice(self.category.dir_name().as_bytes());
        line.push(b'\t');
        line.push(if self.items_moved { b'1' } else { b'0' });
        line.push(b'\t');
        if let Some(id) = &self.item_list_id {
            line.extend_from_slice(id.as_bytes());
        }
        line.push(b'\n');
        line
    }

    /// Parse one line (without its trailing newline).
    pub fn parse_line(line: &[u8]) -> Result<Self, String> {
        let fields: Vec<&[u8]> = line.split(|b| *b == b'\t').collect();
        let [library, category, flag, id] = fields.as_slice() else {
            return Err(format!("expected 4 fields, found {}", fields.len()));
        };

        let library = PathBuf::from(os_from_bytes(library));
        if !library.is_absolute() {
            return Err(format!("library '{}' is not absolute", library.display()));
        }
        let category_str = std::str::from_utf8(category).map_err(|_| "category is not UTF-8")?;
        let category = Category::parse(category_str)
            .ok_or_else(|| format!("unknown category '{category_str}'"))?;
        let items_moved = match *flag {
            b"1" => true,
            b"0" => false,
            other => {
                return Err(format!(
                    "items flag must be 0 or 1, found '{}'",
                    String::from_utf8_lossy(other)
                ));
            }
        };
        let item_list_id = match (items_moved, id.is_empty()) {
            (false, true) => None,
            (false, false) => return Err("item list id present but no items moved".into()),
            (true, true) => return Err("items moved but item list id missing".into()),
            (true, false) => {
                let id = std::str::from_utf8(id).map_err(|_| "item list id is not UTF-8")?;
                if !is_valid_id(id) {
                    return Err(format!("malformed item list id '{id}'"));
                }
                Some(id.to_string())
            }
        };

        Ok(Self {
            library,
            category,
            items_moved,
            item_list_id,
        })
    }
}

/// Content-derived ItemList id: the first 16 hex digits of
/// SHA-256(`library bytes` ‖ 0x00 ‖ `category name`).
pub fn item_list_id(library: &Path, category: Category) -> String {
    let mut hasher = Sha256::new();
    hasher.update(os_to_bytes(library.as_os_str()));
    hasher.update([0u8]);
    hasher.update(category.dir_name().as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(ID_LEN);
    hex
}

pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Encode item names, one per line.
pub fn encode_item_list<S: AsRef<OsStr>>(names: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for name in names {
        out.extend_from_slice(&os_to_bytes(name.as_ref()));
        out.push(b'\n');
    }
    out
}

pub fn decode_item_list(bytes: &[u8]) -> Vec<std::ffi::OsString> {
    bytes
        .split(|b| *b == b'\n')
        .filter(|l| !l.is_empty())
        .map(os_from_bytes)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn populated_record_line_shape() {
        let rec = ActionRecord::linked_populated("/games/b", Category::ShaderCache);
        let line = rec.to_line();
        let id = item_list_id(Path::new("/games/b"), Category::ShaderCache);
        assert_eq!(line, format!("/games/b\tshadercache\t1\t{id}\n").into_bytes());
        assert_eq!(ActionRecord::parse_line(&line[..line.len() - 1]).unwrap(), rec);
    }

    #[test]
    fn id_is_stable_and_category_specific() {
        let a = item_list_id(Path::new("/games/b"), Category::ShaderCache);
        assert_eq!(a, item_list_id(Path::new("/games/b"), Category::ShaderCache));
        assert_ne!(a, item_list_id(Path::new("/games/b"), Category::CompatData));
        assert!(is_valid_id(&a));
    }

    #[test]
    fn rejects_malformed_lines() {
        for bad in [
            &b"/games/b\tshadercache\t1"[..],
            b"relative\tshadercache\t0\t",
            b"/games/b\tdownloading\t0\t",
            b"/games/b\tshadercache\t2\t",
            b"/games/b\tshadercache\t1\t",
            b"/games/b\tshadercache\t0\tabcdef0123456789",
            b"/games/b\tshadercache\t1\tnot-hex",
        ] {
            assert!(ActionRecord::parse_line(bad).is_err(), "{:?}", String::from_utf8_lossy(bad));
        }
    }

    #[test]
    fn item_list_skips_blank_lines() {
        let names = decode_item_list(b"f1\n\nf2\n");
        assert_eq!(names, vec![std::ffi::OsString::from("f1"), "f2".into()]);
        assert_eq!(encode_item_list(&names), b"f1\nf2\n");
    }
}
