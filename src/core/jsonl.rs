use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_BYTES: usize = 256 * 1024;

/// Stream a JSON-lines file in fixed-size chunks, invoking `on_line` with the
/// bytes of each line and a `was_truncated` flag.
///
/// A line whose length exceeds `max_line_bytes` or `prefix_bytes` is flagged
/// truncated and its payload dropped (empty slice) so memory stays bounded;
/// scanning continues with the next line. The final partial line at EOF is
/// still emitted if non-empty. Decoding each line is the caller's concern.
pub fn scan_lines<P, F>(
    path: P,
    max_line_bytes: usize,
    prefix_bytes: usize,
    mut on_line: F,
) -> std::io::Result<()>
where
    P: AsRef<Path>,
    F: FnMut(&[u8], bool),
{
    let mut file = File::open(path)?;
    let budget = max_line_bytes.min(prefix_bytes);

    let mut chunk = vec![0u8; CHUNK_BYTES];
    let mut current: Vec<u8> = Vec::with_capacity(4 * 1024);
    let mut line_bytes: usize = 0;
    let mut truncated = false;

    loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            if line_bytes > 0 {
                let payload: &[u8] = if truncated { &[] } else { current.as_slice() };
                on_line(payload, truncated);
            }
            break;
        }

        let mut rest = &chunk[..read];
        while let Some(nl) = rest.iter().position(|&b| b == b'\n') {
            let (part, after) = rest.split_at(nl);
            rest = &after[1..];

            line_bytes += part.len();
            if !truncated {
                if line_bytes > budget {
                    truncated = true;
                    current.clear();
                } else {
                    current.extend_from_slice(part);
                }
            }

            if line_bytes > 0 {
                let payload: &[u8] = if truncated { &[] } else { current.as_slice() };
                on_line(payload, truncated);
            }
            current.clear();
            line_bytes = 0;
            truncated = false;
        }

        // Partial line spanning into the next chunk: keep counting but drop
        // the payload as soon as it blows the budget.
        line_bytes += rest.len();
        if !truncated {
            if line_bytes > budget {
                truncated = true;
                current.clear();
            } else {
                current.extend_from_slice(rest);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents).expect("write");
        file
    }

    fn collect(path: &Path, max: usize, prefix: usize) -> Vec<(Vec<u8>, bool)> {
        let mut lines = Vec::new();
        scan_lines(path, max, prefix, |bytes, truncated| {
            lines.push((bytes.to_vec(), truncated));
        })
        .expect("scan");
        lines
    }

    #[test]
    fn splits_on_newlines() {
        let file = write_temp(b"{\"a\":1}\n{\"b\":2}\n");
        let lines = collect(file.path(), 1024, 1024);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (b"{\"a\":1}".to_vec(), false));
        assert_eq!(lines[1], (b"{\"b\":2}".to_vec(), false));
    }

    #[test]
    fn emits_final_partial_line() {
        let file = write_temp(b"first\nsecond-no-newline");
        let lines = collect(file.path(), 1024, 1024);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], (b"second-no-newline".to_vec(), false));
    }

    #[test]
    fn skips_empty_lines() {
        let file = write_temp(b"a\n\nb\n");
        let lines = collect(file.path(), 1024, 1024);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, b"a");
        assert_eq!(lines[1].0, b"b");
    }

    #[test]
    fn oversized_line_is_dropped_and_flagged() {
        let mut contents = Vec::new();
        contents.extend_from_slice(b"small\n");
        contents.extend(std::iter::repeat(b'x').take(2000));
        contents.push(b'\n');
        contents.extend_from_slice(b"after\n");

        let file = write_temp(&contents);
        let lines = collect(file.path(), 1000, 1000);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], (b"small".to_vec(), false));
        assert_eq!(lines[1], (Vec::new(), true));
        assert_eq!(lines[2], (b"after".to_vec(), false));
    }

    #[test]
    fn prefix_budget_also_truncates() {
        let file = write_temp(b"0123456789\nok\n");
        let lines = collect(file.path(), 1024, 4);
        assert_eq!(lines[0], (Vec::new(), true));
        assert_eq!(lines[1], (b"ok".to_vec(), false));
    }

    #[test]
    fn line_spanning_chunks_is_reassembled() {
        // Longer than one read chunk, within budget.
        let long = vec![b'y'; CHUNK_BYTES + 100];
        let mut contents = long.clone();
        contents.push(b'\n');
        let file = write_temp(&contents);
        let lines = collect(file.path(), CHUNK_BYTES * 2, CHUNK_BYTES * 2);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0.len(), long.len());
        assert!(!lines[0].1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = scan_lines("/nonexistent/usage.jsonl", 1024, 1024, |_, _| {});
        assert!(result.is_err());
    }
}
