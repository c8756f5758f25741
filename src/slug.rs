//! # Slug Generation
//!
//! URL-safe slug derivation for perks, categories and blog posts. Slugs are
//! lowercase ASCII alphanumerics separated by single hyphens, bounded in
//! length, and made unique per table with a numeric suffix probe.

use rand::Rng;

/// Default maximum slug length.
pub const DEFAULT_MAX_LENGTH: usize = 60;

const FALLBACK_LENGTH: usize = 8;
const FALLBACK_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Derive a slug from free-form text.
///
/// Lowercases the input, treats every run of characters outside `[a-z0-9]`
/// as a single hyphen separator, and trims leading and trailing hyphens.
/// Results longer than `max_length` are cut there, then trimmed back to the
/// previous hyphen when that hyphen sits in the final fifth of the budget,
/// so truncation prefers a word boundary over a sliced word.
///
/// Input with no usable characters at all yields a random 8-character slug
/// rather than an empty string.
pub fn slugify(input: &str, max_length: usize) -> String {
    let mut slug = String::with_capacity(input.len().min(max_length));
    let mut pending_separator = false;

    for ch in input.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }

    if slug.len() > max_length {
        slug.truncate(max_length);
        if let Some(pos) = slug.rfind('-')
            && pos > max_length * 4 / 5
        {
            slug.truncate(pos);
        }
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        return random_slug();
    }

    slug
}

/// Derive a slug with the default length budget.
pub fn slugify_default(input: &str) -> String {
    slugify(input, DEFAULT_MAX_LENGTH)
}

fn random_slug() -> String {
    let mut rng = rand::thread_rng();
    (0..FALLBACK_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..FALLBACK_CHARSET.len());
            FALLBACK_CHARSET[idx] as char
        })
        .collect()
}

/// Make `base` unique by probing `base`, `base-1`, `base-2`, ... until
/// `is_taken` reports a free candidate.
///
/// The caller supplies the existence check, typically a slug lookup that
/// excludes the row being updated.
pub async fn ensure_unique<F, Fut>(base: &str, mut is_taken: F) -> anyhow::Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<bool>>,
{
    let mut candidate = base.to_string();
    let mut suffix = 1u64;

    while is_taken(candidate.clone()).await? {
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }

    Ok(candidate)
}
