#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for virtual world adapters.
//!
//! Backends never read the world directly. They receive a [`Scene`] captured
//! through the world's read-only query module, which lists what should be
//! drawn for every cell of a [`Viewport`].

use anyhow::Result as AnyResult;
use std::{error::Error, fmt};
use virtual_world_core::{EntityId, EntityKind, ImageHandle, Point};
use virtual_world_world::{query, WorldModel};

/// Rectangular window onto the world grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    origin: Point,
    columns: u32,
    rows: u32,
}

impl Viewport {
    /// Creates a viewport whose top-left cell is `origin`.
    pub fn new(origin: Point, columns: u32, rows: u32) -> Result<Self, RenderingError> {
        if columns == 0 || rows == 0 {
            return Err(RenderingError::EmptyViewport { columns, rows });
        }
        Ok(Self {
            origin,
            columns,
            rows,
        })
    }

    /// Viewport spanning the entire world.
    pub fn covering(world: &WorldModel) -> Result<Self, RenderingError> {
        let (columns, rows) = world.dimensions();
        Self::new(Point::new(0, 0), columns, rows)
    }

    /// World cell shown in the top-left corner.
    #[must_use]
    pub const fn origin(&self) -> Point {
        self.origin
    }

    /// Number of visible columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of visible rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Converts a viewport-relative cell into world coordinates.
    #[must_use]
    pub fn to_world(&self, column: u32, row: u32) -> Point {
        self.origin
            .offset(saturating_i32(column), saturating_i32(row))
    }

    /// Reports whether the world cell falls inside the viewport.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        let column = i64::from(point.col()) - i64::from(self.origin.col());
        let row = i64::from(point.row()) - i64::from(self.origin.row());
        (0..i64::from(self.columns)).contains(&column) && (0..i64::from(self.rows)).contains(&row)
    }
}

fn saturating_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Entity drawn on top of a cell's background.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityPresentation {
    /// Identifier of the drawn entity.
    pub id: EntityId,
    /// Kind of the drawn entity.
    pub kind: EntityKind,
    /// Image currently displayed for the entity.
    pub image: ImageHandle,
}

/// Everything a backend draws for one visible cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellPresentation {
    /// World coordinates of the cell.
    pub point: Point,
    /// Background image, absent when the cell lies outside the world.
    pub background: Option<ImageHandle>,
    /// Entity occupying the cell, if any.
    pub entity: Option<EntityPresentation>,
}

/// Frame description captured from the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scene {
    viewport: Viewport,
    cells: Vec<CellPresentation>,
}

impl Scene {
    /// Captures what should be drawn for every cell of `viewport`.
    ///
    /// Cells are listed row by row, left to right.
    #[must_use]
    pub fn capture(world: &WorldModel, viewport: Viewport) -> Self {
        let mut cells = Vec::with_capacity(viewport.columns as usize * viewport.rows as usize);
        for row in 0..viewport.rows {
            for column in 0..viewport.columns {
                let point = viewport.to_world(column, row);
                let view = query::cell_view(world, point);
                cells.push(CellPresentation {
                    point,
                    background: view.map(|cell| cell.background),
                    entity: view.and_then(|cell| cell.occupant).map(|occupant| {
                        EntityPresentation {
                            id: occupant.id,
                            kind: occupant.kind,
                            image: occupant.image,
                        }
                    }),
                });
            }
        }
        Self { viewport, cells }
    }

    /// Viewport the scene was captured for.
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Captured cells, row by row.
    #[must_use]
    pub fn cells(&self) -> &[CellPresentation] {
        &self.cells
    }

    /// Captured cells of a single viewport row.
    #[must_use]
    pub fn row(&self, row: u32) -> &[CellPresentation] {
        let width = self.viewport.columns as usize;
        let start = row as usize * width;
        self.cells.get(start..start + width).unwrap_or(&[])
    }

    /// Number of visible entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.entity.is_some()).count()
    }
}

/// Rendering backend capable of presenting captured scenes.
pub trait RenderingBackend {
    /// Draws one frame.
    fn present(&mut self, scene: &Scene) -> AnyResult<()>;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// Viewports must show at least one cell.
    EmptyViewport {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyViewport { columns, rows } => {
                write!(
                    f,
                    "viewport must show at least one cell (received {columns}x{rows})"
                )
            }
        }
    }
}

impl Error for RenderingError {}
