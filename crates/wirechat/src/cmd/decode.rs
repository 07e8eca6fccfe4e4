use wirechat_frame::decode_frame;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;
    let frame = decode_frame(&bytes).map_err(|err| frame_error("decode failed", err))?;
    print_frame(&frame, bytes.len(), format);
    Ok(SUCCESS)
}

/// Hex bytes as printed by a packet dump: spaces, colons and a `0x` prefix are allowed.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let input = input.trim();
    let input = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if digits.is_empty() {
        return Err(CliError::new(DATA_INVALID, "no frame bytes given"));
    }
    hex::decode(&digits).map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex: {err}")))
}
