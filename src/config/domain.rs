//! Enumerated configuration choices and their string forms.
use std::fmt;
use std::str::FromStr;

use crate::eddy_errors::EddyError;

/// Geographic domain preset. Drives the bounding box and the search ellipse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Global,
    Regional,
    MedSea,
    BlackSea,
}

impl FromStr for Domain {
    type Err = EddyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Domain::Global),
            "regional" => Ok(Domain::Regional),
            "medsea" => Ok(Domain::MedSea),
            "blacksea" => Ok(Domain::BlackSea),
            _ => Err(EddyError::UnknownDomain(s.to_string())),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Domain::Global => "Global",
            Domain::Regional => "Regional",
            Domain::MedSea => "MedSea",
            Domain::BlackSea => "BlackSea",
        };
        f.write_str(s)
    }
}

/// Field being contoured.
///
/// * `Sla` – sea level anomaly; anticyclones are maxima, cyclones are minima.
/// * `Q` – a positive-definite rotation diagnostic; eddies are maxima and the
///   polarity comes from the sign of the relative vorticity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticType {
    Sla,
    Q,
}

impl FromStr for DiagnosticType {
    type Err = EddyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SLA" => Ok(DiagnosticType::Sla),
            "Q" => Ok(DiagnosticType::Q),
            _ => Err(EddyError::UnknownDiagnostic(s.to_string())),
        }
    }
}

impl fmt::Display for DiagnosticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticType::Sla => f.write_str("SLA"),
            DiagnosticType::Q => f.write_str("Q"),
        }
    }
}

/// Smoothing applied before contouring. The filter itself is provided by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmoothingKind {
    Gaussian,
    Hanning,
}

impl FromStr for SmoothingKind {
    type Err = EddyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gaussian" => Ok(SmoothingKind::Gaussian),
            "hanning" => Ok(SmoothingKind::Hanning),
            _ => Err(EddyError::UnknownSmoothing(s.to_string())),
        }
    }
}

impl fmt::Display for SmoothingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmoothingKind::Gaussian => f.write_str("Gaussian"),
            SmoothingKind::Hanning => f.write_str("Hanning"),
        }
    }
}

/// How the reported eddy center is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CenterMethod {
    /// Center of the least-squares circle fitted to the contour.
    #[default]
    FittedCircle,
    /// Centroid of the enclosed pixels weighted by `|value - level|`.
    AnomalyWeighted,
}

/// Order in which contour levels are visited by the collapser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LevelOrder {
    /// Most extreme level first: each eddy is reported at its most extreme
    /// qualifying contour and the enclosing weaker contours are skipped.
    #[default]
    StrongestFirst,
    /// Weakest level first: the outermost qualifying contour wins.
    WeakestFirst,
}

#[cfg(test)]
mod domain_test {
    use super::*;

    #[test]
    fn test_domain_from_str() {
        assert_eq!("Global".parse::<Domain>().unwrap(), Domain::Global);
        assert_eq!(" medsea ".parse::<Domain>().unwrap(), Domain::MedSea);
        assert_eq!(
            "Atlantis".parse::<Domain>(),
            Err(EddyError::UnknownDomain("Atlantis".into()))
        );
    }

    #[test]
    fn test_diagnostic_from_str() {
        assert_eq!("sla".parse::<DiagnosticType>().unwrap(), DiagnosticType::Sla);
        assert_eq!("Q".parse::<DiagnosticType>().unwrap(), DiagnosticType::Q);
        assert!(matches!(
            "EKE".parse::<DiagnosticType>(),
            Err(EddyError::UnknownDiagnostic(_))
        ));
    }

    #[test]
    fn test_smoothing_round_trip_through_display() {
        for kind in [SmoothingKind::Gaussian, SmoothingKind::Hanning] {
            assert_eq!(kind.to_string().parse::<SmoothingKind>().unwrap(), kind);
        }
    }
}
