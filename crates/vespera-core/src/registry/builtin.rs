use super::profiles::{
    DrizzleKernel, DrizzleParams, EmissionLine, FilterKind, FilterProfile, Interpolation,
    SensorProfile, SkyProfile, StackingProfile,
};
use super::Registry;

pub(super) fn builtin_registry() -> Registry {
    Registry {
        sensor: imx676(),
        filters: filters(),
        skies: skies(),
        stacking: stacking(),
    }
}

fn imx676() -> SensorProfile {
    SensorProfile {
        name: "Sony IMX676 (Vespera Pro)".into(),
        bayer_pattern: "GBRG".into(),
        pixel_size_um: 2.0,
        resolution: (3536, 3536),
        bit_depth: 12,
        qe_peak: 0.91,
        luminance_weights: [0.25, 0.68, 0.07],
        bottom_up_readout: true,
    }
}

fn filter(name: &str, kind: FilterKind, description: &str) -> FilterProfile {
    FilterProfile {
        name: name.into(),
        kind,
        description: description.into(),
    }
}

fn filters() -> Vec<FilterProfile> {
    vec![
        filter(
            "No Filter (Stock)",
            FilterKind::Broadband,
            "Standard RGB processing",
        ),
        filter(
            "SVBONY SV220 Dual-Band (Ha/OIII)",
            FilterKind::DualBand,
            "Extracts Ha and OIII channels for HOO palette",
        ),
        filter(
            "L-Pro / CLS (Light Pollution)",
            FilterKind::BroadbandLightPollution,
            "Broadband with LP suppression - standard RGB processing",
        ),
        filter(
            "Ha Narrowband",
            FilterKind::SingleNarrowband(EmissionLine::Ha),
            "Extracts Ha channel only (monochrome output)",
        ),
        filter(
            "OIII Narrowband",
            FilterKind::SingleNarrowband(EmissionLine::Oiii),
            "Extracts OIII channel only (monochrome output)",
        ),
    ]
}

fn sky(
    name: &str,
    sigma: (f32, f32),
    background_samples: u32,
    background_tolerance: f32,
    gradient_correction: bool,
    description: &str,
) -> SkyProfile {
    SkyProfile {
        name: name.into(),
        sigma_low: sigma.0,
        sigma_high: sigma.1,
        background_samples,
        background_tolerance,
        gradient_correction,
        description: description.into(),
    }
}

fn skies() -> Vec<SkyProfile> {
    vec![
        sky(
            "Bortle 1-2 (Excellent Dark)",
            (3.0, 3.0),
            6,
            1.0,
            false,
            "Remote dark sites, minimal light pollution",
        ),
        sky(
            "Bortle 3-4 (Rural)",
            (3.0, 3.0),
            9,
            1.0,
            true,
            "Rural areas, some light domes on horizon",
        ),
        sky(
            "Bortle 5-6 (Suburban)",
            (2.5, 3.0),
            12,
            0.8,
            true,
            "Suburban skies, noticeable light pollution",
        ),
        sky(
            "Bortle 7-8 (Urban)",
            (2.0, 2.5),
            16,
            0.5,
            true,
            "City skies, heavy light pollution",
        ),
    ]
}

fn drizzle(
    name: &str,
    scale: f32,
    kernel: DrizzleKernel,
    interpolation: Interpolation,
    description: &str,
) -> StackingProfile {
    StackingProfile {
        name: name.into(),
        drizzle: Some(DrizzleParams {
            scale,
            pixel_fraction: 1.0,
            kernel,
            interpolation,
        }),
        description: description.into(),
    }
}

fn stacking() -> Vec<StackingProfile> {
    vec![
        drizzle(
            "Bayer Drizzle (Recommended)",
            1.0,
            DrizzleKernel::Gaussian,
            Interpolation::Area,
            "Best for field rotation, gaussian kernel for smooth CFA",
        ),
        drizzle(
            "Bayer Drizzle (Square)",
            1.0,
            DrizzleKernel::Square,
            Interpolation::Area,
            "Classic drizzle kernel, mathematically flux-preserving",
        ),
        drizzle(
            "Bayer Drizzle (Nearest)",
            1.0,
            DrizzleKernel::Gaussian,
            Interpolation::Nearest,
            "Nearest-neighbor interpolation to minimize moire patterns",
        ),
        StackingProfile {
            name: "Standard Registration".into(),
            drizzle: None,
            description: "Faster processing, good for short sessions with minimal rotation".into(),
        },
        drizzle(
            "Drizzle 2x Upscale",
            2.0,
            DrizzleKernel::Square,
            Interpolation::Area,
            "Doubles resolution, requires many well-dithered frames (50+)",
        ),
    ]
}
