use std::fmt;

use crate::registry::DrizzleParams;

/// Flux normalization applied while stacking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Normalization {
    /// Calibration frames must not be normalized against each other.
    None,
    AdditiveScale,
}

/// Output framing when applying a two-pass registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    Max,
}

/// Sigma-rejection stacking parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct StackParams {
    pub sequence: String,
    pub sigma_low: f32,
    pub sigma_high: f32,
    pub normalization: Normalization,
    /// Normalize the output to [0, 1], equalize RGB and write 32-bit floats.
    pub linear_output: bool,
    pub feather: Option<u8>,
    pub output: String,
}

/// One host-engine operation. Every variant renders to the host's
/// `name arg arg ...` command form.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Cd(String),
    Convert {
        base: String,
        out_dir: Option<String>,
    },
    Load(String),
    Save(String),
    Stack(StackParams),
    Register {
        sequence: String,
        drizzle: Option<DrizzleParams>,
        two_pass: bool,
    },
    ApplyRegistration {
        sequence: String,
        drizzle: Option<DrizzleParams>,
        framing: Framing,
    },
    Calibrate {
        sequence: String,
        dark: String,
        debayer: bool,
    },
    Split {
        outputs: [String; 3],
    },
    Compose {
        inputs: [String; 3],
        output: String,
    },
    SubtractBackground {
        samples: u32,
        tolerance: f32,
        smooth: f32,
    },
    ColorCalibrate {
        limit_magnitude: f32,
    },
    PlateSolve,
    RemoveIccProfile,
    MirrorX {
        bottom_up: bool,
    },
    PyScript {
        script: String,
        args: Vec<String>,
    },
}

fn drizzle_args(args: &mut Vec<String>, drizzle: &Option<DrizzleParams>) {
    if let Some(d) = drizzle {
        args.push("-drizzle".into());
        args.push(format!("-scale={}", d.scale));
        args.push(format!("-pixfrac={}", d.pixel_fraction));
        args.push(format!("-kernel={}", d.kernel.as_arg()));
        args.push(format!("-interp={}", d.interpolation.as_arg()));
    }
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cd(_) => "cd",
            Self::Convert { .. } => "convert",
            Self::Load(_) => "load",
            Self::Save(_) => "save",
            Self::Stack(_) => "stack",
            Self::Register { .. } => "register",
            Self::ApplyRegistration { .. } => "seqapplyreg",
            Self::Calibrate { .. } => "calibrate",
            Self::Split { .. } => "split",
            Self::Compose { .. } => "rgbcomp",
            Self::SubtractBackground { .. } => "subsky",
            Self::ColorCalibrate { .. } => "pcc",
            Self::PlateSolve => "platesolve",
            Self::RemoveIccProfile => "icc_remove",
            Self::MirrorX { .. } => "mirrorx",
            Self::PyScript { .. } => "pyscript",
        }
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        match self {
            Self::Cd(dir) => args.push(dir.clone()),
            Self::Convert { base, out_dir } => {
                args.push(base.clone());
                if let Some(dir) = out_dir {
                    args.push(format!("-out={dir}"));
                }
            }
            Self::Load(name) | Self::Save(name) => args.push(name.clone()),
            Self::Stack(p) => {
                args.push(p.sequence.clone());
                args.push("rej".into());
                args.push(p.sigma_low.to_string());
                args.push(p.sigma_high.to_string());
                match p.normalization {
                    Normalization::None => args.push("-nonorm".into()),
                    Normalization::AdditiveScale => args.push("-norm=addscale".into()),
                }
                if p.linear_output {
                    args.push("-output_norm".into());
                    args.push("-rgb_equal".into());
                    args.push("-32b".into());
                }
                if let Some(radius) = p.feather {
                    args.push(format!("-feather={radius}"));
                }
                args.push(format!("-out={}", p.output));
            }
            Self::Register {
                sequence,
                drizzle,
                two_pass,
            } => {
                args.push(sequence.clone());
                if *two_pass {
                    args.push("-2pass".into());
                }
                drizzle_args(&mut args, drizzle);
            }
            Self::ApplyRegistration {
                sequence,
                drizzle,
                framing,
            } => {
                args.push(sequence.clone());
                match framing {
                    Framing::Max => args.push("-framing=max".into()),
                }
                drizzle_args(&mut args, drizzle);
            }
            Self::Calibrate {
                sequence,
                dark,
                debayer,
            } => {
                args.push(sequence.clone());
                args.push(format!("-dark={dark}"));
                args.push("-cc=dark".into());
                args.push("-cfa".into());
                args.push("-equalize_cfa".into());
                if *debayer {
                    args.push("-debayer".into());
                }
            }
            Self::Split { outputs } => args.extend(outputs.iter().cloned()),
            Self::Compose { inputs, output } => {
                args.extend(inputs.iter().cloned());
                args.push(format!("-out={output}"));
            }
            Self::SubtractBackground {
                samples,
                tolerance,
                smooth,
            } => {
                args.push("-rbf".into());
                args.push(format!("-samples={samples}"));
                args.push(format!("-tolerance={tolerance}"));
                args.push(format!("-smooth={smooth}"));
            }
            Self::ColorCalibrate { limit_magnitude } => {
                args.push(format!("-limitmag={limit_magnitude}"));
            }
            Self::PlateSolve | Self::RemoveIccProfile => {}
            Self::MirrorX { bottom_up } => {
                if *bottom_up {
                    args.push("-bottomup".into());
                }
            }
            Self::PyScript { script, args: extra } => {
                args.push(script.clone());
                args.extend(extra.iter().cloned());
            }
        }
        args
    }

    /// The command as a single script line, quoting arguments with spaces.
    pub fn to_line(&self) -> String {
        let mut line = self.name().to_string();
        for arg in self.args() {
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push('"');
                line.push_str(&arg);
                line.push('"');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line())
    }
}
