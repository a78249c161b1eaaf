pub fn chunk_document(body: &str, max_chunk_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in body.split("\n\n") {
        let trimmed = paragraph.trim();
        if trimmed.is_empty() {
            continue;
        }

        if !current.is_empty() && current.len() + trimmed.len() + 2 > max_chunk_chars {
            chunks.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(trimmed);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_long_bodies_into_multiple_chunks() {
        let body = "Our cancellation policy requires notice.\n\n".repeat(30);
        let chunks = chunk_document(&body, 160);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| !chunk.is_empty()));
    }

    #[test]
    fn short_body_is_one_chunk() {
        let chunks = chunk_document("one paragraph only", 400);
        assert_eq!(chunks, vec!["one paragraph only".to_string()]);
    }
}
