//! Interactive first-run setup and configuration display.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use btfollow_core::{schema_table, Backend, Device, FollowConfig};

/// Ask the user to pick one of `devices`, re-prompting until the answer is valid.
///
/// # Errors
///
/// Returns an error if `devices` is empty, the input ends, or I/O fails.
pub fn select_device<R: BufRead, W: Write>(
    devices: &[Device],
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> Result<Device> {
    let count = devices.len();
    if count == 0 {
        bail!("No paired Bluetooth devices found. Pair your devices first.");
    }

    loop {
        writeln!(output, "{prompt} [1-{count}]")?;
        for (i, device) in devices.iter().enumerate() {
            writeln!(output, "{}) {device}", i + 1)?;
        }
        write!(output, ":")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("Input closed before a device was selected");
        }

        match line.trim().parse::<usize>() {
            Ok(index) if (1..=count).contains(&index) => {
                let selected = devices[index - 1].clone();
                writeln!(output, "You selected {selected}")?;
                return Ok(selected);
            }
            _ => writeln!(output, "Invalid selection")?,
        }
    }
}

/// Walk the user through picking a primary and a follower, then write `path`.
///
/// # Errors
///
/// Returns an error if the backend cannot list devices, a selected device
/// has no address, input ends early, or the file cannot be written.
pub fn run_setup<B, R, W>(
    backend: &B,
    path: &Path,
    input: &mut R,
    output: &mut W,
) -> Result<FollowConfig>
where
    B: Backend + ?Sized,
    R: BufRead,
    W: Write,
{
    writeln!(output, "Creating configuration file in {}", path.display())?;
    let devices = Device::list_all(backend).context("Failed to list paired devices")?;

    loop {
        let primary = select_device(
            &devices,
            "Select primary device (e.g. \"Keyboard foo\")",
            input,
            output,
        )?;
        writeln!(output)?;
        writeln!(output, "{:^50}", format!("Selected {primary} as primary device"))?;
        writeln!(output)?;

        let follower = select_device(
            &devices,
            &format!("Select device to connect when {primary} is present"),
            input,
            output,
        )?;
        if follower == primary {
            writeln!(output)?;
            writeln!(output, "{:*^50}", "You've selected the same device!")?;
            writeln!(output)?;
            continue;
        }

        let config = FollowConfig::new(primary.field("address")?, follower.field("address")?);
        config
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        return Ok(config);
    }
}

/// Print the configuration file at `path` followed by its schema.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, or output fails.
pub fn show_config<W: Write>(path: &Path, output: &mut W) -> Result<()> {
    if !path.exists() {
        writeln!(output, "Configuration file not created yet. Run with -c")?;
        return Ok(());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    writeln!(output, "Configuration found in {}", path.display())?;
    writeln!(output)?;
    writeln!(output, "{content}")?;
    writeln!(output, "{:-^50}", "Schema")?;
    write!(output, "{}", schema_table())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use btfollow_core::MockBackend;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn backend() -> MockBackend {
        MockBackend::with_paired([
            "address: aa-aa, name: Keyboard",
            "address: bb-bb, name: Mouse",
            "address: cc-cc, name: Trackpad",
        ])
    }

    fn devices() -> Vec<Device> {
        Device::list_all(&backend()).unwrap()
    }

    #[test]
    fn test_select_last_device() {
        let mut input = Cursor::new("3\n");
        let mut output = Vec::new();
        let device = select_device(&devices(), "Pick", &mut input, &mut output).unwrap();
        assert_eq!(device.address(), Some("cc-cc"));

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Pick [1-3]"));
        assert!(text.contains("1) Keyboard aa-aa"));
        assert!(text.contains("You selected Trackpad cc-cc"));
    }

    #[test]
    fn test_invalid_selection_reprompts() {
        let mut input = Cursor::new("0\nfour\n4\n2\n");
        let mut output = Vec::new();
        let device = select_device(&devices(), "Pick", &mut input, &mut output).unwrap();
        assert_eq!(device.address(), Some("bb-bb"));

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("Invalid selection").count(), 3);
    }

    #[test]
    fn test_input_closed() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        assert!(select_device(&devices(), "Pick", &mut input, &mut output).is_err());
    }

    #[test]
    fn test_no_devices() {
        let mut input = Cursor::new("1\n");
        let mut output = Vec::new();
        assert!(select_device(&[], "Pick", &mut input, &mut output).is_err());
    }

    #[test]
    fn test_setup_writes_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("btfollow").join("config.toml");
        let mut input = Cursor::new("1\n3\n");
        let mut output = Vec::new();

        let config = run_setup(&backend(), &path, &mut input, &mut output).unwrap();
        assert_eq!(config, FollowConfig::new("aa-aa", "cc-cc"));
        assert_eq!(FollowConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_setup_rejects_same_device() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut input = Cursor::new("2\n2\n2\n1\n");
        let mut output = Vec::new();

        let config = run_setup(&backend(), &path, &mut input, &mut output).unwrap();
        assert_eq!(config.primary, "bb-bb");
        assert_eq!(config.follower, "aa-aa");

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("You've selected the same device!"));
    }

    #[test]
    fn test_show_missing_config() {
        let dir = TempDir::new().unwrap();
        let mut output = Vec::new();
        show_config(&dir.path().join("config.toml"), &mut output).unwrap();
        assert!(String::from_utf8(output).unwrap().contains("Run with -c"));
    }

    #[test]
    fn test_show_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        FollowConfig::new("aa-aa", "bb-bb").save(&path).unwrap();

        let mut output = Vec::new();
        show_config(&path, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("primary = \"aa-aa\""));
        assert!(text.contains("Schema"));
        assert!(text.contains("sleep_time"));
    }
}
