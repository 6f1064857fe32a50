use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

/// Reads a newline separated list of image names.
///
/// Surrounding whitespace is trimmed from every line and blank lines are ignored.
pub fn read_image_list(path: impl AsRef<Path>) -> io::Result<HashSet<String>> {
    Ok(parse_image_list(&fs::read_to_string(path)?))
}

pub fn parse_image_list(contents: &str) -> HashSet<String> {
    contents
        .lines()
        .map(|line| line.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n')))
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_skips_blank_lines() {
        let names = parse_image_list("a.jpg\n  b.jpg\t\r\n\n \t \ndir/c d.jpg\r\n");
        let expected: HashSet<String> = ["a.jpg", "b.jpg", "dir/c d.jpg"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, expected);
    }
}
