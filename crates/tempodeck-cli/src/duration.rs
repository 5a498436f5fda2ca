//! Argument parsers for durations, weekdays and alarm sounds.

use chrono::Duration;
use tempodeck_core::{Recurrence, SoundRef, BUILT_IN_SOUNDS, MAX_DURATION_MS};

const WEEKDAYS: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Parse `90`, `90s`, `25m`, `1h30m`, `MM:SS` or `HH:MM:SS`, up to 366 days.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let secs = if s.contains(':') {
        parse_clock(&s)
    } else if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse::<i64>().ok()
    } else {
        parse_units(&s)
    };

    match secs {
        Some(secs) if secs > MAX_DURATION_MS / 1000 => {
            Err(format!("duration too long: '{input}' (at most 366 days)"))
        }
        Some(secs) if secs > 0 => Ok(Duration::seconds(secs)),
        Some(_) => Err(format!("duration must be positive: '{input}'")),
        None => Err(format!(
            "invalid duration '{input}' (try 90, 90s, 25m, 1h30m or 00:25:00)"
        )),
    }
}

fn parse_clock(s: &str) -> Option<i64> {
    let parts = s
        .split(':')
        .map(|p| p.parse::<i64>().ok().filter(|n| *n >= 0))
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [m, sec] if *sec < 60 => m.checked_mul(60)?.checked_add(*sec),
        [h, m, sec] if *m < 60 && *sec < 60 => h.checked_mul(3600)?.checked_add(m * 60 + sec),
        _ => None,
    }
}

fn parse_units(s: &str) -> Option<i64> {
    let mut total = 0i64;
    let mut digits = String::new();
    let mut last_rank = 0;
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let (rank, scale) = match c {
            'h' => (3, 3600),
            'm' => (2, 60),
            's' => (1, 1),
            _ => return None,
        };
        // Units must appear once each, largest first.
        if digits.is_empty() || (last_rank != 0 && rank >= last_rank) {
            return None;
        }
        total = total.checked_add(digits.parse::<i64>().ok()?.checked_mul(scale)?)?;
        digits.clear();
        last_rank = rank;
    }
    digits.is_empty().then_some(total)
}

/// Parse `daily`, `weekdays`, `weekends`, or a comma list of day names or
/// indices (`mon,wed`, `1,3`; 0 = Sunday).
pub fn parse_days(input: &str) -> Result<Recurrence, String> {
    match input.trim().to_ascii_lowercase().as_str() {
        "daily" | "everyday" => return Ok(Recurrence::daily()),
        "weekdays" => return Ok(Recurrence::weekdays()),
        "weekends" => return Ok(Recurrence::weekends()),
        "once" => return Ok(Recurrence::Once),
        _ => {}
    }

    let days = input
        .split(',')
        .map(|d| {
            let d = d.trim().to_ascii_lowercase();
            if let Ok(index) = d.parse::<u8>() {
                return Ok(index);
            }
            WEEKDAYS
                .iter()
                .position(|name| d.starts_with(name))
                .and_then(|i| u8::try_from(i).ok())
                .ok_or_else(|| format!("unknown day '{d}'"))
        })
        .collect::<Result<Vec<u8>, String>>()?;
    Recurrence::weekly(days).map_err(|e| e.to_string())
}

/// A built-in sound id, or a path/URI for a custom sound.
pub fn parse_sound(input: &str) -> SoundRef {
    let input = input.trim();
    if BUILT_IN_SOUNDS.iter().any(|(id, _)| *id == input) {
        return SoundRef::built_in(input);
    }
    let name = std::path::Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(input)
        .to_string();
    SoundRef::Custom {
        name,
        uri: input.to_string(),
    }
}

/// `MM:SS`, or `H:MM:SS` from an hour up.
pub fn format_ms(ms: i64) -> String {
    let secs = (ms.max(0) + 999) / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
