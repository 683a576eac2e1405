//! A single build world driven one command at a time.
//!
//! [`Session`] is the serialized request stream in front of the core: it owns
//! the only [`BuildWorld`], and every placement or removal runs to completion
//! before the next command is read.

use std::io::{self, BufRead, Write};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use fort_core::prelude::*;

use crate::protocol::{Command, Response};

/// Errors that end a session or stop it from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading commands or writing responses failed.
    #[error("Session IO error: {0}")]
    Io(#[from] io::Error),

    /// The world could not be built from the given config.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Lines that parsed into a command.
    pub commands: usize,
    /// Responses of type `error`, including unparseable lines.
    pub errors: usize,
    /// Whether the session ended on `quit` rather than end of input.
    pub quit: bool,
}

/// Owns one build world and answers protocol commands against it.
#[derive(Debug, Clone)]
pub struct Session {
    world: BuildWorld,
}

impl Session {
    /// Start a session over an empty flat world.
    pub fn new(config: BuildConfig) -> Result<Self> {
        Ok(Self {
            world: BuildWorld::new(config)?,
        })
    }

    /// Start a session from a RON config file.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(BuildConfig::load(path)?)
    }

    /// The world behind this session.
    pub fn world(&self) -> &BuildWorld {
        &self.world
    }

    /// Apply one command and produce its response.
    pub fn handle(&mut self, command: Command) -> Response {
        let name = command.name();
        match command {
            Command::Validate { request } => {
                let result = request
                    .resolve()
                    .and_then(|(placement, _)| self.world.validate_placement(&placement));
                Response::Validation {
                    valid: result.is_ok(),
                    code: result.err().map(|e| e.code().to_string()),
                }
            }

            Command::Place { request } => {
                let placed = request.resolve().and_then(|(placement, material)| {
                    self.world.place_structure(placement, material)
                });
                match placed {
                    Ok(structure) => Response::Placed { structure },
                    Err(err) => Response::placement_error(&err, name),
                }
            }

            Command::Preview { kind, x, y, z, yaw } => self.preview(&kind, [x, y, z], yaw),

            Command::Remove { id } => {
                let outcome = self.world.remove_structure(StructureId::new(id));
                Response::Removed {
                    destroyed: outcome.destroyed_ids(),
                    collapsed: outcome.collapsed().count(),
                }
            }

            Command::Get {
                kind,
                x,
                z,
                level,
                rotation,
            } => {
                let lookup = kind.parse::<StructureKind>().and_then(|kind| {
                    let orientation = rotation
                        .map(|degrees| {
                            Rotation::from_degrees(degrees)
                                .map(|r| Orientation::for_kind(kind, r))
                                .ok_or(PlacementError::InvalidRotation { kind, degrees })
                        })
                        .transpose()?;
                    Ok((kind, orientation))
                });
                match lookup {
                    Ok((kind, orientation)) => Response::Structure {
                        structure: self
                            .world
                            .get_structure_at(GridCoordinate::new(x, z, level), kind, orientation)
                            .cloned(),
                    },
                    Err(err) => Response::placement_error(&err, name),
                }
            }

            Command::QueryArea { x, z, radius } => Response::Structures {
                structures: self.world.query_area(x, z, radius),
            },

            Command::SetHealth { id, hp } => {
                let id = StructureId::new(id);
                match self.world.set_health(id, hp) {
                    Some(hp) => Response::Health { id, hp },
                    None => Response::error("not_found", format!("No structure {id}"), Some(name)),
                }
            }

            Command::SetClock { clock } => {
                self.world.set_clock(clock);
                Response::ack(name)
            }

            Command::Hash => Response::StateHash {
                hash: self.world.state_hash(),
                clock: self.world.clock(),
                structures: self.world.len(),
            },

            Command::Check => match self.world.check_invariants() {
                Ok(()) => Response::Check {
                    ok: true,
                    violation: None,
                },
                Err(violation) => {
                    warn!(%violation, "Invariant check failed");
                    Response::Check {
                        ok: false,
                        violation: Some(violation.to_string()),
                    }
                }
            },

            Command::Save { path } => match self.world.snapshot().save(&path) {
                Ok(()) => {
                    info!(path = %path, structures = self.world.len(), "Saved snapshot");
                    Response::ack(name)
                }
                Err(err) => Response::error("io", err.to_string(), Some(name)),
            },

            Command::Load { path } => match self.load(&path) {
                Ok(()) => Response::ready(self.world.len()),
                Err(err) => Response::error("snapshot", err.to_string(), Some(name)),
            },

            Command::Quit => Response::Bye,
        }
    }

    fn preview(&self, kind: &str, position: [f64; 3], yaw: f64) -> Response {
        let kind = match kind.parse::<StructureKind>() {
            Ok(kind) => kind,
            Err(err) => return Response::placement_error(&err, "preview"),
        };
        let to_fixed = |v: f64| v.is_finite().then(|| Fixed::checked_from_num(v)).flatten();
        let (Some(x), Some(y), Some(z), Some(yaw)) = (
            to_fixed(position[0]),
            to_fixed(position[1]),
            to_fixed(position[2]),
            to_fixed(yaw),
        ) else {
            return Response::error(
                "invalid_position",
                "Position or yaw is outside the fixed-point range",
                Some("preview"),
            );
        };

        let preview = PlacementPreview::new(&self.world, kind, Vec3Fixed::new(x, y, z), yaw);
        let snapped = preview.snapped_position;
        Response::Preview {
            placement: preview.placement,
            position: [
                snapped.x.to_num::<f64>(),
                snapped.y.to_num::<f64>(),
                snapped.z.to_num::<f64>(),
            ],
            valid: preview.is_valid(),
            code: preview.validation.err().map(|e| e.code().to_string()),
        }
    }

    fn load(&mut self, path: &str) -> Result<()> {
        let snapshot = WorldSnapshot::load(path)?;
        let config = self.world.config().clone();
        let terrain = *self.world.terrain();
        self.world = BuildWorld::restore(config, terrain, &snapshot)?;
        info!(path, structures = self.world.len(), "Loaded snapshot");
        Ok(())
    }

    /// Run the command loop until `quit` or end of input.
    ///
    /// Writes `ready` first, then one response per non-blank input line.
    /// Lines that fail to parse, including ones that are not UTF-8, are
    /// answered with an `error` and skipped.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
    ) -> std::result::Result<SessionStats, SessionError> {
        let mut stats = SessionStats::default();
        write_response(&mut output, &Response::ready(self.world.len()))?;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match Command::from_json(line) {
                        Ok(command) => {
                            stats.commands += 1;
                            let quit = matches!(command, Command::Quit);
                            debug!(cmd = command.name(), "Handling command");
                            let response = self.handle(command);
                            stats.quit = quit;
                            response
                        }
                        Err(err) => {
                            warn!(error = %err, "Failed to parse command");
                            Response::error(
                                "parse",
                                format!("Failed to parse command: {err}"),
                                None,
                            )
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Command line is not UTF-8");
                    Response::error("parse", format!("Command is not valid UTF-8: {err}"), None)
                }
            };

            if matches!(response, Response::Error { .. }) {
                stats.errors += 1;
            }
            write_response(&mut output, &response)?;

            if stats.quit {
                break;
            }
        }

        info!(
            commands = stats.commands,
            errors = stats.errors,
            structures = self.world.len(),
            "Session ended"
        );
        Ok(stats)
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}
