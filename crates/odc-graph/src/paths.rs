//! Endpoint construction
//!
//! Items are addressed three ways:
//! - Root: `/me/drive/root`
//! - Path: `/me/drive/root:{path}:` (each segment percent-encoded)
//! - Id: `/me/drive/items/{id}`
//!
//! Operations append a suffix (`/children`, `/content`, ...). A path-based
//! address is closed with `:` before the suffix.

use odc_core::ports::ItemRef;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside one path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'^')
    .add(b'|')
    .add(b'[')
    .add(b']');

const ROOT: &str = "/me/drive/root";

/// Percent-encode each segment of a remote path, keeping the separators
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Endpoint of `item`, optionally followed by an operation suffix
pub fn item_path(item: &ItemRef, suffix: &str) -> String {
    let suffix = suffix.trim_start_matches('/');
    match item {
        ItemRef::Path(path) if !path.is_empty() && path != "/" => {
            let base = format!("{ROOT}:{}:", encode_path(path));
            if suffix.is_empty() {
                base
            } else {
                format!("{base}/{suffix}")
            }
        }
        ItemRef::Id(id) => join(&format!("/me/drive/items/{}", encode_segment(id)), suffix),
        _ => join(ROOT, suffix),
    }
}

/// Endpoint of the child `name` of `parent`, followed by `suffix`
///
/// Used for uploads, where the target file may not exist yet.
pub fn child_item_path(parent: &ItemRef, name: &str, suffix: &str) -> String {
    let name = encode_segment(name);
    let suffix = suffix.trim_start_matches('/');
    match parent {
        ItemRef::Path(path) if !path.is_empty() && path != "/" => {
            format!("{ROOT}:{}/{name}:/{suffix}", encode_path(path))
        }
        ItemRef::Id(id) => format!("/me/drive/items/{}:/{name}:/{suffix}", encode_segment(id)),
        _ => format!("{ROOT}:/{name}:/{suffix}"),
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

fn join(base: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_paths() {
        assert_eq!(item_path(&ItemRef::Root, ""), "/me/drive/root");
        assert_eq!(item_path(&ItemRef::Root, "children"), "/me/drive/root/children");
        assert_eq!(
            child_item_path(&ItemRef::Root, "file.txt", "content"),
            "/me/drive/root:/file.txt:/content"
        );
    }

    #[test]
    fn test_path_addressing_is_colon_delimited() {
        let item = ItemRef::Path("/Documents/My Report.pdf".into());
        assert_eq!(
            item_path(&item, ""),
            "/me/drive/root:/Documents/My%20Report.pdf:"
        );
        assert_eq!(
            item_path(&item, "createLink"),
            "/me/drive/root:/Documents/My%20Report.pdf:/createLink"
        );
        assert_eq!(
            child_item_path(&ItemRef::Path("/Documents".into()), "a#b.txt", "createUploadSession"),
            "/me/drive/root:/Documents/a%23b.txt:/createUploadSession"
        );
    }

    #[test]
    fn test_id_addressing() {
        let item = ItemRef::Id("ABC!123".into());
        assert_eq!(item_path(&item, "children"), "/me/drive/items/ABC!123/children");
        assert_eq!(
            child_item_path(&item, "x.bin", "content"),
            "/me/drive/items/ABC!123:/x.bin:/content"
        );
    }
}
