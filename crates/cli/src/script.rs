use anyhow::{anyhow, bail, Context, Result};
use media::MediaResource;
use timeline::TrackId;

/// One line of a session script.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(TrackId, MediaResource),
    Wait,
    Scrub(f64),
    Toggle,
    Advance(f64),
    Drag(TrackId, f32),
    Resize(f32),
    Hover(bool),
    Show,
}

/// Parse a script line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') { return Ok(None); }
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    let cmd = match (verb, args.as_slice()) {
        ("load", [slot, res]) => Command::Load(parse_slot(slot)?, MediaResource::parse(res)?),
        ("wait", []) => Command::Wait,
        ("scrub", [t]) => Command::Scrub(parse_finite(t, "scrub time")?),
        ("toggle", []) => Command::Toggle,
        ("advance", [secs]) => {
            let secs = parse_finite(secs, "advance seconds")?;
            if secs < 0.0 { bail!("advance needs a non-negative duration, got {secs}"); }
            Command::Advance(secs)
        }
        ("drag", [slot, dx]) => Command::Drag(parse_slot(slot)?, parse_finite(dx, "drag delta")? as f32),
        ("resize", [px]) => Command::Resize(parse_finite(px, "viewport width")? as f32),
        ("hover", ["on"]) => Command::Hover(true),
        ("hover", ["off"]) => Command::Hover(false),
        ("show", []) => Command::Show,
        _ => bail!("unrecognized command: {line}"),
    };
    Ok(Some(cmd))
}

fn parse_slot(s: &str) -> Result<TrackId> {
    match s.to_ascii_lowercase().as_str() {
        "a" => Ok(TrackId::A),
        "b" => Ok(TrackId::B),
        _ => Err(anyhow!("unknown track slot {s:?} (expected a or b)")),
    }
}

fn parse_finite(s: &str, what: &str) -> Result<f64> {
    let v = s.parse::<f64>().with_context(|| format!("invalid {what}: {s:?}"))?;
    if !v.is_finite() { bail!("{what} must be finite, got {s:?}"); }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_line("scrub 4.5").unwrap(), Some(Command::Scrub(4.5)));
        assert_eq!(parse_line("  drag B 400 ").unwrap(), Some(Command::Drag(TrackId::B, 400.0)));
        assert_eq!(parse_line("hover on").unwrap(), Some(Command::Hover(true)));
        assert_eq!(
            parse_line("load a synthetic:intro.mp4:5").unwrap(),
            Some(Command::Load(TrackId::A, MediaResource::synthetic("intro.mp4", 5.0)))
        );
        assert_eq!(
            parse_line("load b clips/cut.mp4").unwrap(),
            Some(Command::Load(TrackId::B, MediaResource::file("clips/cut.mp4")))
        );
    }

    #[test]
    fn test_comments_and_blanks() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("# setup").unwrap(), None);
    }

    #[test]
    fn test_rejects_malformed_lines() {
        assert!(parse_line("scrub").is_err());
        assert!(parse_line("scrub soon").is_err());
        assert!(parse_line("drag c 10").is_err());
        assert!(parse_line("advance -1").is_err());
        assert!(parse_line("advance inf").is_err());
        assert!(parse_line("advance NaN").is_err());
        assert!(parse_line("scrub -inf").is_err());
        assert!(parse_line("resize nan").is_err());
        assert!(parse_line("drag a infinity").is_err());
        assert!(parse_line("hover maybe").is_err());
        assert!(parse_line("rewind").is_err());
    }
}
