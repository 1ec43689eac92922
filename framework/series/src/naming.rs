/// Suffix shared by every series file.
pub const RESULTS_SUFFIX: &str = "_results.csv";

/// Derive a name that is safe to use as a file name from a scenario name.
///
/// The name is lowercased, whitespace and path separators become `_` and leading dots are
/// removed so the result can't be a hidden file or point at a parent directory.
pub fn safe_name(name: &str) -> String {
    let name = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            c if c.is_whitespace() => '_',
            '/' | '\\' => '_',
            c => c,
        })
        .collect::<String>();

    name.trim_start_matches('.').to_string()
}

/// The series file name for a scenario, `<safe name>_results.csv`.
pub fn series_file_name(name: &str) -> String {
    format!("{}{RESULTS_SUFFIX}", safe_name(name))
}

/// Human readable test name for a series file name.
///
/// Returns `None` if the file is not a series file.
pub fn display_name(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(RESULTS_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(stem.len());
    let mut previous_is_alphabetic = false;
    for c in stem.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if previous_is_alphabetic {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_alphabetic = true;
        } else {
            out.push(c);
            previous_is_alphabetic = false;
        }
    }

    Some(out)
}
