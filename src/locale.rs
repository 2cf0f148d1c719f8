//! Locale negotiation.

/// Merge the remote-reported supported locales with the user's own locale
/// into a priority-ordered list.
///
/// The user locale is always at index 0, exactly once: its first
/// occurrence is removed from `supported` before prepending, and the
/// remaining entries keep their relative order. An empty `supported` list
/// yields `[user]`. The first element is what downstream selection
/// pre-selects.
pub fn merge(supported: &[String], user: &str) -> Vec<String> {
    let mut result = Vec::with_capacity(supported.len() + 1);
    result.push(user.to_string());

    let mut removed = false;
    for code in supported {
        if !removed && code == user {
            removed = true;
            continue;
        }
        result.push(code.clone());
    }

    result
}
