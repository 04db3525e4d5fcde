//! Hand-built embedded bundle used by the unit tests
//!
//! Layout:
//! ```text
//! public/index.html
//! public/css/site.css
//! public/empty/
//! secret.txt
//! ```

use include_dir::{Dir, DirEntry, File};

const PUBLIC_CSS: &[DirEntry<'static>] = &[DirEntry::File(File::new(
    "public/css/site.css",
    b"body { margin: 0 }",
))];

const PUBLIC: &[DirEntry<'static>] = &[
    DirEntry::File(File::new("public/index.html", b"<h1>home</h1>")),
    DirEntry::Dir(Dir::new("public/css", PUBLIC_CSS)),
    DirEntry::Dir(Dir::new("public/empty", &[])),
];

const ROOT: &[DirEntry<'static>] = &[
    DirEntry::Dir(Dir::new("public", PUBLIC)),
    DirEntry::File(File::new("secret.txt", b"top secret")),
];

pub(crate) static BUNDLE: Dir<'static> = Dir::new("", ROOT);
