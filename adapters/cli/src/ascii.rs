use std::io::Write;

use anyhow::{Context, Result as AnyResult};
use virtual_world_core::EntityKind;
use virtual_world_rendering::{CellPresentation, RenderingBackend, Scene};

/// Backend that prints each frame as a grid of characters.
#[derive(Debug)]
pub(crate) struct AsciiBackend<W> {
    out: W,
    frames: u64,
}

impl<W: Write> AsciiBackend<W> {
    pub(crate) fn new(out: W) -> Self {
        Self { out, frames: 0 }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderingBackend for AsciiBackend<W> {
    fn present(&mut self, scene: &Scene) -> AnyResult<()> {
        self.frames += 1;
        let viewport = scene.viewport();
        writeln!(
            self.out,
            "frame {} ({} entities)",
            self.frames,
            scene.entity_count()
        )
        .context("failed to write frame header")?;
        for row in 0..viewport.rows() {
            let line: String = scene.row(row).iter().map(glyph).collect();
            writeln!(self.out, "{line}").context("failed to write frame row")?;
        }
        writeln!(self.out).context("failed to terminate frame")?;
        self.out.flush().context("failed to flush frame")
    }
}

fn glyph(cell: &CellPresentation) -> char {
    match (cell.background, cell.entity) {
        (None, _) => ' ',
        (Some(_), None) => '.',
        (Some(_), Some(entity)) => match entity.kind {
            EntityKind::Goomab => 'g',
            EntityKind::Fire => '*',
            EntityKind::Obstacle => '#',
        },
    }
}
