//! SubRip captions timed by a word-count heuristic.
//!
//! Each non-empty lyric line gets a share of the vocal duration proportional
//! to its word count. Nothing here listens to the audio.

/// Builds an SRT document spreading `lyrics` over `duration_secs`.
///
/// Returns an empty string when the lyrics contain no words.
pub fn build_srt(lyrics: &str, duration_secs: u32) -> String {
    let lines: Vec<(&str, usize)> = lyrics
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| (l, l.split_whitespace().count()))
        .collect();

    let total_words: usize = lines.iter().map(|(_, words)| words).sum();
    if total_words == 0 {
        return String::new();
    }

    let total_ms = u64::from(duration_secs) * 1000;
    let mut srt = String::new();
    let mut elapsed_words = 0usize;

    for (index, (line, words)) in lines.iter().enumerate() {
        let start = total_ms * elapsed_words as u64 / total_words as u64;
        elapsed_words += words;
        let end = total_ms * elapsed_words as u64 / total_words as u64;

        srt.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            timestamp(start),
            timestamp(end),
            line
        ));
    }

    srt
}

/// `HH:MM:SS,mmm`
fn timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1000) % 60;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}
