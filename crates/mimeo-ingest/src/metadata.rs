//! Structural metadata derived from where a file sits under its content root.

use mimeo_core::{keys, MetadataBag};
use std::path::{Component, Path};

/// Separator used when folding directories beyond depth two into `sub_levels`.
pub const SUB_LEVEL_SEPARATOR: &str = "/";

/// Derive `category`, `subcategory` and `sub_levels` from the directories
/// between `root` and `path`. The file name itself is not a level.
///
/// Paths outside `root`, or directly inside it, give an empty bag.
pub fn structural_metadata(root: &Path, path: &Path) -> MetadataBag {
    let mut bag = MetadataBag::new();

    let Ok(relative) = path.strip_prefix(root) else {
        return bag;
    };

    let mut levels: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    // Drop the file name
    levels.pop();

    let mut levels = levels.into_iter();
    if let Some(category) = levels.next() {
        bag.insert(keys::CATEGORY, category);
    }
    if let Some(subcategory) = levels.next() {
        bag.insert(keys::SUBCATEGORY, subcategory);
    }
    let rest: Vec<String> = levels.collect();
    if !rest.is_empty() {
        bag.insert(keys::SUB_LEVELS, rest.join(SUB_LEVEL_SEPARATOR));
    }

    bag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_levels() {
        let bag = structural_metadata(Path::new("/lib/docs"), Path::new("/lib/docs/A/B/C/file.pdf"));

        assert_eq!(bag.text(keys::CATEGORY), Some("A"));
        assert_eq!(bag.text(keys::SUBCATEGORY), Some("B"));
        assert_eq!(bag.text(keys::SUB_LEVELS), Some("C"));
    }

    #[test]
    fn test_deep_levels_collapse() {
        let bag = structural_metadata(Path::new("docs"), Path::new("docs/A/B/C/D/E/file.txt"));
        assert_eq!(bag.text(keys::SUB_LEVELS), Some("C/D/E"));
    }

    #[test]
    fn test_shallow_paths_omit_keys() {
        let bag = structural_metadata(Path::new("docs"), Path::new("docs/A/file.txt"));
        assert_eq!(bag.text(keys::CATEGORY), Some("A"));
        assert!(bag.get(keys::SUBCATEGORY).is_none());
        assert!(bag.get(keys::SUB_LEVELS).is_none());

        let bag = structural_metadata(Path::new("docs"), Path::new("docs/file.txt"));
        assert!(bag.is_empty());
    }

    #[test]
    fn test_outside_root_is_empty() {
        let bag = structural_metadata(Path::new("docs"), Path::new("elsewhere/A/file.txt"));
        assert!(bag.is_empty());
    }
}
