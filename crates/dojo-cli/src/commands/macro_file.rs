//! Offline operations on exported macro text files.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use dojo_core::input::InputMask;
use dojo_core::macros::{MacroSlot, export_slot, import_slot, parse_macro};

use crate::cli::MacroCommand;

pub fn execute(cmd: MacroCommand) -> Result<()> {
    match cmd {
        MacroCommand::Check { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let parsed = parse_macro(&text)
                .with_context(|| format!("parsing {}", file.display()))?;

            let ticks = parsed.mask_stream.len();
            let writes = parsed.buf_stream.len();
            let seconds = ticks as f64 / 64.0;
            println!(
                "{}: {ticks} ticks ({seconds:.2}s at 64Hz), {writes} raw buffer writes",
                file.display().green(),
            );
            Ok(())
        }
        MacroCommand::Mirror { file, output } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            let mut slot = MacroSlot::default();
            import_slot(&mut slot, &text)
                .with_context(|| format!("parsing {}", file.display()))?;

            for mask in &mut slot.mask_stream {
                *mask = InputMask::new(*mask).mirror().bits();
            }
            for write in &mut slot.buf_stream {
                *write = InputMask::new(*write).mirror().bits();
            }
            slot.rebuild_spans();

            let out_path = output.unwrap_or(file);
            std::fs::write(&out_path, export_slot(&slot))
                .with_context(|| format!("writing {}", out_path.display()))?;
            println!("mirrored macro written to {}", out_path.display().green());
            Ok(())
        }
    }
}
