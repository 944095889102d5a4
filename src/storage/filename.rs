const PROMPT_PREFIX_CHARS: usize = 50;
const ID_PREFIX_CHARS: usize = 8;

/// Filesystem- and URL-safe token built from the start of a prompt.
pub fn slugify(prompt: &str) -> String {
    let kept: String = prompt
        .chars()
        .take(PROMPT_PREFIX_CHARS)
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase()
}

/// `<slug>_<first 8 chars of id>`, without extension.
pub fn file_stem(prompt: &str, image_id: &str) -> String {
    let slug = slugify(prompt);
    let slug = if slug.is_empty() { "image".to_string() } else { slug };
    let id_prefix: String = image_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(ID_PREFIX_CHARS)
        .collect();

    if id_prefix.is_empty() {
        slug
    } else {
        format!("{}_{}", slug, id_prefix)
    }
}

/// True when `name` is a bare file name that cannot escape the output directory.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Lower-cased extension with a leading dot, e.g. `.png`.
pub fn dotted_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    Some(format!(".{}", ext.to_ascii_lowercase()))
}
