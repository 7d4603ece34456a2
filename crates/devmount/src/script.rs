//! Symlink recreation script.
//!
//! The script runs once inside the container after startup. Each valid link
//! is replaced unconditionally, so running the script again is harmless.

use std::borrow::Cow;
use std::path::Path;

use shell_escape::escape;

use crate::symlink::SymlinkCandidate;

const HEADER: &str = "#!/bin/bash
# Generated by devmount on every pre-up run. Do not edit.
set -euo pipefail
";

/// Quote a path for interpolation into the script.
#[must_use]
pub fn quote_path(path: &Path) -> String {
    let path_str = path.to_string_lossy();
    escape(Cow::Borrowed(&path_str)).into_owned()
}

/// Render the recreation script for the valid candidates among `symlinks`.
///
/// Invalid candidates contribute nothing. Container paths are derived by
/// stripping `tree_base`, the same mapping used for mounts.
#[must_use]
pub fn render_symlink_script<'a>(
    symlinks: impl IntoIterator<Item = &'a SymlinkCandidate>,
    tree_base: &Path,
) -> String {
    let mut script = String::from(HEADER);

    for candidate in symlinks.into_iter().filter(|c| c.is_valid()) {
        let (Some(link), Some(target)) = (
            candidate.container_link(tree_base),
            candidate.container_target(tree_base),
        ) else {
            continue;
        };

        let parent = link.parent().unwrap_or_else(|| Path::new("/"));
        let link = quote_path(&link);

        script.push_str(&format!(
            "\nmkdir -p {}\nrm -rf {link}\nln -sf {} {link}\n",
            quote_path(parent),
            quote_path(&target)
        ));
    }

    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symlink::{InvalidReason, Validity};
    use std::path::PathBuf;

    fn candidate(link: &str, target: Option<&str>, validity: Validity) -> SymlinkCandidate {
        SymlinkCandidate {
            link_path: PathBuf::from(link),
            raw_target: PathBuf::from("unused"),
            resolved_target: target.map(PathBuf::from),
            validity,
        }
    }

    #[test]
    fn renders_valid_links_only() {
        let base = Path::new("/plugin/mounted-files");
        let symlinks = vec![
            candidate(
                "/plugin/mounted-files/home/mars/link",
                Some("/plugin/mounted-files/root/target.txt"),
                Validity::Valid,
            ),
            candidate(
                "/plugin/mounted-files/root/passwd",
                None,
                Validity::Invalid(InvalidReason::AbsoluteTarget),
            ),
            candidate(
                "/plugin/mounted-files/root/.config/my app",
                Some("/plugin/mounted-files/root/app settings"),
                Validity::Valid,
            ),
        ];

        insta::assert_snapshot!(render_symlink_script(&symlinks, base), @r"
        #!/bin/bash
        # Generated by devmount on every pre-up run. Do not edit.
        set -euo pipefail

        mkdir -p /home/mars
        rm -rf /home/mars/link
        ln -sf /root/target.txt /home/mars/link

        mkdir -p /root/.config
        rm -rf '/root/.config/my app'
        ln -sf '/root/app settings' '/root/.config/my app'
        ");
    }

    #[test]
    fn no_links_is_header_only() {
        let script = render_symlink_script(std::iter::empty(), Path::new("/plugin/mounted-files"));
        assert_eq!(script, HEADER);
    }

    #[test]
    fn quotes_shell_metacharacters() {
        assert_eq!(quote_path(Path::new("/root/plain.txt")), "/root/plain.txt");
        assert_eq!(quote_path(Path::new("/root/$HOME")), "'/root/$HOME'");
        assert_eq!(quote_path(Path::new("/root/it's")), "'/root/it'\\''s'");
    }
}
