//! Edge attribute bitfield
//!
//! Layout (version 1, least significant bit first):
//!
//! ```text
//!   bit  0      forward access
//!   bit  1      backward access
//!   bit  2      ferry
//!   bit  3      roundabout
//!   bits 4..10  base speed km/h        (6 bits, saturates at 34)
//!   bits 10..14 way class code         (4 bits)
//!   bits 14..20 incline %              (6 bits, saturates at 40)
//!   bits 20..26 decline %              (6 bits, saturates at 40)
//!   bits 26..33 inclining length %     (7 bits, encode saturates to 50..=100)
//! ```
//!
//! Slopes are non-negative magnitudes; the direction of travel decides
//! whether the incline or the decline field is read.

use crate::way_class::WayClass;

pub const LAYOUT_VERSION: u16 = 1;

/// Highest base speed the speed field holds (km/h).
pub const MAX_BASE_SPEED: u64 = 34;

/// Highest incline or decline the slope fields hold (%).
pub const MAX_SLOPE: u64 = 40;

/// Bounds of the inclining length share accepted by [`encode`].
pub const MIN_INCLINE_PERCENT: u64 = 50;
pub const MAX_INCLINE_PERCENT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Forward,
    Backward,
    Ferry,
    Roundabout,
    Speed,
    Class,
    Incline,
    Decline,
    InclinePercent,
}

impl Field {
    #[inline]
    const fn shift(self) -> u32 {
        match self {
            Field::Forward => 0,
            Field::Backward => 1,
            Field::Ferry => 2,
            Field::Roundabout => 3,
            Field::Speed => 4,
            Field::Class => 10,
            Field::Incline => 14,
            Field::Decline => 20,
            Field::InclinePercent => 26,
        }
    }

    #[inline]
    const fn width(self) -> u32 {
        match self {
            Field::Forward | Field::Backward | Field::Ferry | Field::Roundabout => 1,
            Field::Speed => 6,
            Field::Class => 4,
            Field::Incline | Field::Decline => 6,
            Field::InclinePercent => 7,
        }
    }

    #[inline]
    const fn mask(self) -> u64 {
        ((1u64 << self.width()) - 1) << self.shift()
    }
}

/// Packed per-edge attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EdgeFlags(pub u64);

impl EdgeFlags {
    #[inline]
    pub fn get(self, field: Field) -> u64 {
        (self.0 & field.mask()) >> field.shift()
    }

    /// Store `value` into `field`, truncated to the field width.
    #[inline]
    pub fn set(&mut self, field: Field, value: u64) {
        self.0 = (self.0 & !field.mask()) | ((value << field.shift()) & field.mask());
    }

    #[inline]
    fn flag(self, field: Field) -> bool {
        self.get(field) != 0
    }

    pub fn forward(self) -> bool {
        self.flag(Field::Forward)
    }

    pub fn backward(self) -> bool {
        self.flag(Field::Backward)
    }

    /// Whether the edge may be traversed in the given direction.
    pub fn allows(self, reverse: bool) -> bool {
        if reverse {
            self.backward()
        } else {
            self.forward()
        }
    }

    pub fn is_ferry(self) -> bool {
        self.flag(Field::Ferry)
    }

    pub fn is_roundabout(self) -> bool {
        self.flag(Field::Roundabout)
    }

    pub fn base_speed(self) -> f64 {
        self.get(Field::Speed) as f64
    }

    pub fn class(self) -> WayClass {
        // A 4-bit field always holds a valid class code
        WayClass::all()[self.get(Field::Class) as usize]
    }

    pub fn incline(self) -> u64 {
        self.get(Field::Incline)
    }

    pub fn decline(self) -> u64 {
        self.get(Field::Decline)
    }

    pub fn incline_percent(self) -> u64 {
        self.get(Field::InclinePercent)
    }

    /// Typed view of every field.
    pub fn attributes(self) -> EdgeAttributes {
        EdgeAttributes {
            forward: self.forward(),
            backward: self.backward(),
            ferry: self.is_ferry(),
            roundabout: self.is_roundabout(),
            speed_kmh: self.base_speed(),
            class: self.class(),
            incline: self.incline() as f64,
            decline: self.decline() as f64,
            incline_percent: self.incline_percent() as f64,
        }
    }
}

/// Unpacked edge attributes as produced at import time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeAttributes {
    pub forward: bool,
    pub backward: bool,
    pub ferry: bool,
    pub roundabout: bool,
    pub speed_kmh: f64,
    pub class: WayClass,
    /// Average incline in percent over the inclining share.
    pub incline: f64,
    /// Average decline in percent over the declining share.
    pub decline: f64,
    /// Share of the edge length that inclines, in percent.
    pub incline_percent: f64,
}

impl Default for EdgeAttributes {
    fn default() -> Self {
        Self {
            forward: true,
            backward: true,
            ferry: false,
            roundabout: false,
            speed_kmh: 0.0,
            class: WayClass::UnclassifiedPaved,
            incline: 0.0,
            decline: 0.0,
            incline_percent: MAX_INCLINE_PERCENT as f64,
        }
    }
}

fn quantize(value: f64, min: u64, max: u64) -> u64 {
    if !value.is_finite() || value <= min as f64 {
        return min;
    }
    (value.round() as u64).clamp(min, max)
}

/// Any positive speed stays traversable: zero is reserved for "no access".
fn quantize_speed(speed_kmh: f64) -> u64 {
    match quantize(speed_kmh, 0, MAX_BASE_SPEED) {
        0 if speed_kmh > 0.0 => 1,
        speed => speed,
    }
}

/// Pack attributes. Out-of-range values saturate silently.
pub fn encode(attrs: &EdgeAttributes) -> EdgeFlags {
    let mut flags = EdgeFlags::default();
    flags.set(Field::Forward, attrs.forward as u64);
    flags.set(Field::Backward, attrs.backward as u64);
    flags.set(Field::Ferry, attrs.ferry as u64);
    flags.set(Field::Roundabout, attrs.roundabout as u64);
    flags.set(Field::Speed, quantize_speed(attrs.speed_kmh));
    flags.set(Field::Class, attrs.class.code() as u64);
    flags.set(Field::Incline, quantize(attrs.incline, 0, MAX_SLOPE));
    flags.set(Field::Decline, quantize(attrs.decline, 0, MAX_SLOPE));
    flags.set(
        Field::InclinePercent,
        quantize(
            attrs.incline_percent,
            MIN_INCLINE_PERCENT,
            MAX_INCLINE_PERCENT,
        ),
    );
    flags
}

#[inline]
pub fn decode(flags: EdgeFlags, field: Field) -> u64 {
    flags.get(field)
}

/// Flip the edge direction: access bits and slopes swap, the inclining
/// share becomes its complement. Applying it twice restores the input.
pub fn reverse(flags: EdgeFlags) -> EdgeFlags {
    let mut out = flags;
    out.set(Field::Forward, flags.get(Field::Backward));
    out.set(Field::Backward, flags.get(Field::Forward));
    out.set(Field::Incline, flags.get(Field::Decline));
    out.set(Field::Decline, flags.get(Field::Incline));
    out.set(
        Field::InclinePercent,
        MAX_INCLINE_PERCENT.saturating_sub(flags.get(Field::InclinePercent)),
    );
    out
}
