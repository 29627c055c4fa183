use nom::character::complete::{char, digit1};
use nom::combinator::opt;
use nom::error::{ErrorKind, ParseError};
use nom::sequence::tuple;
use nom::IResult;

/// Parse a compound deletion delay like "1h30m" into seconds.
///
/// Components must appear in d, h, m, s order, each one optional. Matching
/// is prefix-based: anything after the last recognized component is ignored,
/// so "1h30mwhatever" parses as 5400. Returns `None` when no component
/// matches or the total is zero.
pub fn parse_delete_time(input: &str) -> Option<u64> {
    let (_, total) = delete_time(input).ok()?;
    (total > 0).then_some(total)
}

fn delete_time(input: &str) -> IResult<&str, u64> {
    let (input, days) = opt(unit_value('d'))(input)?;
    let (input, hours) = opt(unit_value('h'))(input)?;
    let (input, minutes) = opt(unit_value('m'))(input)?;
    let (input, seconds) = opt(unit_value('s'))(input)?;
    Ok((
        input,
        days.unwrap_or(0) * 86400
            + hours.unwrap_or(0) * 3600
            + minutes.unwrap_or(0) * 60
            + seconds.unwrap_or(0),
    ))
}

fn unit_value(unit: char) -> impl Fn(&str) -> IResult<&str, u64> {
    move |input| {
        let (rest, (value, _)) = tuple((digit1, char(unit)))(input)?;
        let Ok(value) = value.parse::<u64>() else {
            return Err(nom::Err::Error(ParseError::from_error_kind(
                input,
                ErrorKind::Digit,
            )));
        };
        Ok((rest, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compound_durations() {
        assert_eq!(parse_delete_time("1h30m"), Some(5400));
        assert_eq!(parse_delete_time("90s"), Some(90));
        assert_eq!(parse_delete_time("2d"), Some(172_800));
        assert_eq!(parse_delete_time("45m"), Some(2700));
        assert_eq!(parse_delete_time("1d2h3m4s"), Some(93_784));
    }

    #[test]
    fn rejects_zero_and_empty() {
        assert_eq!(parse_delete_time("0s"), None);
        assert_eq!(parse_delete_time(""), None);
        assert_eq!(parse_delete_time("0d0h0m0s"), None);
        assert_eq!(parse_delete_time("garbage"), None);
        assert_eq!(parse_delete_time("5"), None);
    }

    #[test]
    fn ignores_trailing_garbage_after_a_valid_prefix() {
        assert_eq!(parse_delete_time("1h30mwhatever"), Some(5400));
        assert_eq!(parse_delete_time("90s!"), Some(90));
        // out-of-order components count as trailing garbage
        assert_eq!(parse_delete_time("3m2h"), Some(180));
    }
}
