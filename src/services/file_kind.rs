//! File kind classification.
//!
//! Package bundles (`.appx`, `.msix` and their bundle forms) go through the
//! package signing subsystem; everything else is signed as a plain file.

use std::path::Path;

/// Which request path the signing service takes for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Executables, libraries and anything not recognized as a package.
    PlainFile,
    /// App packages and bundles.
    PackageBundle,
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlainFile => write!(f, "plain file"),
            Self::PackageBundle => write!(f, "package bundle"),
        }
    }
}

impl FileKind {
    /// Suffixes routed to the package path, matched case-insensitively.
    pub const PACKAGE_EXTENSIONS: [&'static str; 4] =
        [".appx", ".msix", ".appxbundle", ".msixbundle"];

    /// Classify by file name suffix.
    #[must_use]
    pub fn classify(path: &Path) -> Self {
        let name = path.to_string_lossy().to_ascii_lowercase();
        if Self::PACKAGE_EXTENSIONS
            .iter()
            .any(|ext| name.ends_with(ext))
        {
            Self::PackageBundle
        } else {
            Self::PlainFile
        }
    }

    #[must_use]
    pub const fn is_package(self) -> bool {
        matches!(self, Self::PackageBundle)
    }
}
