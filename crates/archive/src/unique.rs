use std::collections::HashSet;

/// Make every name in `names` unique, preserving order.
///
/// The first occurrence of a name is kept as-is; later duplicates get
/// ` (2)`, ` (3)`, ... inserted before their extension. Comparison is
/// case-insensitive because most desktop filesystems are.
///
/// ```
/// use renamer_archive::unique_names;
///
/// let names = unique_names(["Invoice.pdf", "invoice.pdf", "Invoice.pdf"]);
/// assert_eq!(names, ["Invoice.pdf", "invoice (2).pdf", "Invoice (3).pdf"]);
/// ```
pub fn unique_names<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut result = Vec::new();
    for name in names {
        let name = name.as_ref();
        let mut candidate = name.to_string();
        let mut counter = 1;
        while !taken.insert(candidate.to_lowercase()) {
            counter += 1;
            candidate = with_suffix(name, counter);
        }
        result.push(candidate);
    }
    result
}

fn with_suffix(name: &str, counter: usize) -> String {
    // A leading dot marks a hidden file, not an extension.
    match name.rfind('.').filter(|&pos| pos > 0) {
        Some(pos) => format!("{} ({counter}){}", &name[..pos], &name[pos..]),
        None => format!("{name} ({counter})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["a.txt", "b.txt"], &["a.txt", "b.txt"])]
    #[case(&["a.txt", "a.txt", "a.txt"], &["a.txt", "a (2).txt", "a (3).txt"])]
    #[case(&["README", "readme"], &["README", "readme (2)"])]
    #[case(&[".env", ".env"], &[".env", ".env (2)"])]
    #[case(&["a (2).txt", "a.txt", "a.txt"], &["a (2).txt", "a.txt", "a (3).txt"])]
    #[case(&["archive.tar.gz", "archive.tar.gz"], &["archive.tar.gz", "archive.tar (2).gz"])]
    fn test_unique_names(#[case] input: &[&str], #[case] expected: &[&str]) {
        assert_eq!(unique_names(input), expected);
    }
}
