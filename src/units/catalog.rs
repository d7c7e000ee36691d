//! The compact catalogue and its expansion into the full database.
//!
//! A build step (`tools/unitgen`) serialises the expanded database to
//! JSON; the runtime can equally build it directly via
//! [`UnitRegistry::builtin`](super::UnitRegistry::builtin). Expansion
//! applies SI prefixes to SI-prefixable units, both SI (kilo and up)
//! and binary prefixes to bit/byte, and attaches US/UK variant
//! conversions where the catalogue declares them.

use super::database::{
    AmbiguousSymbolData, ConversionData, CurrencyData, CurrencyDatabase, CurrencyDisplayName,
    DimensionData, DimensionFactor, DisplayName, UnitData, UnitDatabase, VariantArms,
};

struct Prefix {
    name: &'static str,
    symbol: &'static str,
    /// Power of ten (SI) or two (binary).
    power: i32,
}

/// The 25 SI prefixes, quetta through quecto (`deca` also answers to
/// `deka`, folded in at expansion).
const SI_PREFIXES: &[Prefix] = &[
    Prefix { name: "quetta", symbol: "Q", power: 30 },
    Prefix { name: "ronna", symbol: "R", power: 27 },
    Prefix { name: "yotta", symbol: "Y", power: 24 },
    Prefix { name: "zetta", symbol: "Z", power: 21 },
    Prefix { name: "exa", symbol: "E", power: 18 },
    Prefix { name: "peta", symbol: "P", power: 15 },
    Prefix { name: "tera", symbol: "T", power: 12 },
    Prefix { name: "giga", symbol: "G", power: 9 },
    Prefix { name: "mega", symbol: "M", power: 6 },
    Prefix { name: "kilo", symbol: "k", power: 3 },
    Prefix { name: "hecto", symbol: "h", power: 2 },
    Prefix { name: "deca", symbol: "da", power: 1 },
    Prefix { name: "deci", symbol: "d", power: -1 },
    Prefix { name: "centi", symbol: "c", power: -2 },
    Prefix { name: "milli", symbol: "m", power: -3 },
    Prefix { name: "micro", symbol: "µ", power: -6 },
    Prefix { name: "nano", symbol: "n", power: -9 },
    Prefix { name: "pico", symbol: "p", power: -12 },
    Prefix { name: "femto", symbol: "f", power: -15 },
    Prefix { name: "atto", symbol: "a", power: -18 },
    Prefix { name: "zepto", symbol: "z", power: -21 },
    Prefix { name: "yocto", symbol: "y", power: -24 },
    Prefix { name: "ronto", symbol: "r", power: -27 },
    Prefix { name: "quecto", symbol: "q", power: -30 },
];

/// Binary prefixes, kibi through quebi.
const BINARY_PREFIXES: &[Prefix] = &[
    Prefix { name: "kibi", symbol: "Ki", power: 10 },
    Prefix { name: "mebi", symbol: "Mi", power: 20 },
    Prefix { name: "gibi", symbol: "Gi", power: 30 },
    Prefix { name: "tebi", symbol: "Ti", power: 40 },
    Prefix { name: "pebi", symbol: "Pi", power: 50 },
    Prefix { name: "exbi", symbol: "Ei", power: 60 },
    Prefix { name: "zebi", symbol: "Zi", power: 70 },
    Prefix { name: "yobi", symbol: "Yi", power: 80 },
    Prefix { name: "robi", symbol: "Ri", power: 90 },
    Prefix { name: "quebi", symbol: "Qi", power: 100 },
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum PrefixRule {
    None,
    /// All SI prefixes.
    Si,
    /// SI prefixes kilo and above (FLOPS, calories, watt-hours).
    SiFromKilo,
    /// SI prefixes kilo and above plus all binary prefixes (bit, byte).
    SiFromKiloAndBinary,
}

#[derive(Clone, Copy)]
enum Conv {
    Linear(f64),
    Affine { offset: f64, factor: f64 },
    Variant { us: f64, uk: f64 },
}

impl Conv {
    fn into_data(self) -> ConversionData {
        match self {
            Self::Linear(factor) => ConversionData::Linear { factor },
            Self::Affine { offset, factor } => ConversionData::Affine { offset, factor },
            Self::Variant { us, uk } => ConversionData::Variant {
                variants: VariantArms {
                    us: Box::new(ConversionData::Linear { factor: us }),
                    uk: Box::new(ConversionData::Linear { factor: uk }),
                },
            },
        }
    }
}

struct DimDecl {
    id: &'static str,
    name: &'static str,
    base_unit: &'static str,
    derived: &'static [(&'static str, i32)],
    has_named_units: bool,
}

struct UnitDecl {
    id: &'static str,
    dimension: &'static str,
    symbol: &'static str,
    singular: &'static str,
    plural: &'static str,
    aliases: &'static [&'static str],
    conversion: Conv,
    prefixes: PrefixRule,
    is_base: bool,
    count_as_terms: u8,
}

macro_rules! unit {
    ($id:literal, $dim:literal, $sym:literal, $sing:literal, $plur:literal,
     $aliases:expr, $conv:expr, $prefixes:expr, $base:expr) => {
        UnitDecl {
            id: $id,
            dimension: $dim,
            symbol: $sym,
            singular: $sing,
            plural: $plur,
            aliases: $aliases,
            conversion: $conv,
            prefixes: $prefixes,
            is_base: $base,
            count_as_terms: 1,
        }
    };
}

const DIMENSIONS: &[DimDecl] = &[
    DimDecl { id: "length", name: "Length", base_unit: "meter", derived: &[], has_named_units: true },
    DimDecl { id: "mass", name: "Mass", base_unit: "gram", derived: &[], has_named_units: true },
    DimDecl { id: "time", name: "Time", base_unit: "second", derived: &[], has_named_units: true },
    DimDecl { id: "temperature", name: "Temperature", base_unit: "kelvin", derived: &[], has_named_units: true },
    DimDecl { id: "current", name: "Electric current", base_unit: "ampere", derived: &[], has_named_units: true },
    DimDecl { id: "luminous_intensity", name: "Luminous intensity", base_unit: "candela", derived: &[], has_named_units: true },
    DimDecl { id: "dimensionless", name: "Dimensionless", base_unit: "unitless", derived: &[], has_named_units: false },
    DimDecl { id: "cycle", name: "Angle", base_unit: "cycle", derived: &[], has_named_units: true },
    DimDecl { id: "beat", name: "Beat", base_unit: "beat", derived: &[], has_named_units: true },
    DimDecl { id: "operation", name: "Operation", base_unit: "operation", derived: &[], has_named_units: true },
    DimDecl { id: "printing", name: "Printing", base_unit: "dot", derived: &[], has_named_units: true },
    DimDecl { id: "data", name: "Data", base_unit: "bit", derived: &[], has_named_units: true },
    DimDecl { id: "currency", name: "Currency", base_unit: "usd", derived: &[], has_named_units: true },
    DimDecl { id: "area", name: "Area", base_unit: "square_meter", derived: &[("length", 2)], has_named_units: true },
    DimDecl { id: "volume", name: "Volume", base_unit: "cubic_meter", derived: &[("length", 3)], has_named_units: true },
    DimDecl { id: "speed", name: "Speed", base_unit: "meter_per_second", derived: &[("length", 1), ("time", -1)], has_named_units: true },
    DimDecl { id: "force", name: "Force", base_unit: "newton", derived: &[("mass", 1), ("length", 1), ("time", -2)], has_named_units: true },
    DimDecl { id: "energy", name: "Energy", base_unit: "joule", derived: &[("force", 1), ("length", 1)], has_named_units: true },
    DimDecl { id: "power", name: "Power", base_unit: "watt", derived: &[("energy", 1), ("time", -1)], has_named_units: true },
    DimDecl { id: "pressure", name: "Pressure", base_unit: "pascal", derived: &[("force", 1), ("area", -1)], has_named_units: true },
    DimDecl { id: "frequency", name: "Frequency", base_unit: "hertz", derived: &[("cycle", 1), ("time", -1)], has_named_units: true },
    DimDecl { id: "compute_rate", name: "Compute rate", base_unit: "flops", derived: &[("operation", 1), ("time", -1)], has_named_units: true },
    DimDecl { id: "pixel_density", name: "Pixel density", base_unit: "dot_per_meter", derived: &[("printing", 1), ("length", -1)], has_named_units: true },
    DimDecl { id: "tempo", name: "Tempo", base_unit: "beat_per_second", derived: &[("beat", 1), ("time", -1)], has_named_units: true },
];

#[allow(clippy::unreadable_literal)]
const UNITS: &[UnitDecl] = &[
    // ==== Length ====
    unit!("meter", "length", "m", "meter", "meters", &["metre", "metres"], Conv::Linear(1.0), PrefixRule::Si, true),
    unit!("inch", "length", "in", "inch", "inches", &["\"", "″"], Conv::Linear(0.0254), PrefixRule::None, false),
    unit!("foot", "length", "ft", "foot", "feet", &["'", "′"], Conv::Linear(0.3048), PrefixRule::None, false),
    unit!("yard", "length", "yd", "yard", "yards", &[], Conv::Linear(0.9144), PrefixRule::None, false),
    unit!("mile", "length", "mi", "mile", "miles", &[], Conv::Linear(1609.344), PrefixRule::None, false),
    unit!("nautical_mile", "length", "nmi", "nautical mile", "nautical miles", &[], Conv::Linear(1852.0), PrefixRule::None, false),
    unit!("astronomical_unit", "length", "au", "astronomical unit", "astronomical units", &[], Conv::Linear(1.495978707e11), PrefixRule::None, false),
    unit!("light_year", "length", "ly", "light year", "light years", &["lightyear", "lightyears"], Conv::Linear(9.4607304725808e15), PrefixRule::None, false),
    unit!("parsec", "length", "pc", "parsec", "parsecs", &[], Conv::Linear(3.0856775814913673e16), PrefixRule::None, false),
    // ==== Mass ====
    unit!("gram", "mass", "g", "gram", "grams", &["gramme", "grammes"], Conv::Linear(1.0), PrefixRule::Si, true),
    unit!("pound", "mass", "lb", "pound", "pounds", &["lbs"], Conv::Linear(453.59237), PrefixRule::None, false),
    unit!("ounce", "mass", "oz", "ounce", "ounces", &[], Conv::Linear(28.349523125), PrefixRule::None, false),
    unit!("stone", "mass", "st", "stone", "stones", &[], Conv::Linear(6350.29318), PrefixRule::None, false),
    unit!("tonne", "mass", "t", "tonne", "tonnes", &["metric ton", "metric tons"], Conv::Linear(1.0e6), PrefixRule::None, false),
    unit!("ton", "mass", "tn", "ton", "tons", &["short ton", "long ton"], Conv::Variant { us: 907184.74, uk: 1016046.9088 }, PrefixRule::None, false),
    unit!("carat", "mass", "ct", "carat", "carats", &[], Conv::Linear(0.2), PrefixRule::None, false),
    // ==== Time ====
    unit!("second", "time", "s", "second", "seconds", &["sec", "secs"], Conv::Linear(1.0), PrefixRule::Si, true),
    unit!("minute", "time", "min", "minute", "minutes", &["mins"], Conv::Linear(60.0), PrefixRule::None, false),
    unit!("hour", "time", "h", "hour", "hours", &["hr", "hrs"], Conv::Linear(3600.0), PrefixRule::None, false),
    unit!("day", "time", "d", "day", "days", &[], Conv::Linear(86400.0), PrefixRule::None, false),
    unit!("week", "time", "wk", "week", "weeks", &[], Conv::Linear(604800.0), PrefixRule::None, false),
    unit!("fortnight", "time", "fn", "fortnight", "fortnights", &[], Conv::Linear(1209600.0), PrefixRule::None, false),
    // Average month and year; calendar arithmetic never goes through
    // these factors.
    unit!("month", "time", "mo", "month", "months", &[], Conv::Linear(2629800.0), PrefixRule::None, false),
    unit!("year", "time", "yr", "year", "years", &[], Conv::Linear(31557600.0), PrefixRule::None, false),
    unit!("decade", "time", "dec", "decade", "decades", &[], Conv::Linear(315576000.0), PrefixRule::None, false),
    unit!("century", "time", "c", "century", "centuries", &[], Conv::Linear(3155760000.0), PrefixRule::None, false),
    unit!("millennium", "time", "kyr", "millennium", "millennia", &[], Conv::Linear(31557600000.0), PrefixRule::None, false),
    // ==== Temperature ====
    unit!("kelvin", "temperature", "K", "kelvin", "kelvins", &[], Conv::Linear(1.0), PrefixRule::Si, true),
    unit!("celsius", "temperature", "°C", "degree Celsius", "degrees Celsius", &["celsius", "centigrade"], Conv::Affine { offset: 273.15, factor: 1.0 }, PrefixRule::None, false),
    unit!("fahrenheit", "temperature", "°F", "degree Fahrenheit", "degrees Fahrenheit", &["fahrenheit"], Conv::Affine { offset: 459.67, factor: 5.0 / 9.0 }, PrefixRule::None, false),
    unit!("rankine", "temperature", "°R", "degree Rankine", "degrees Rankine", &["rankine"], Conv::Linear(5.0 / 9.0), PrefixRule::None, false),
    // ==== Electric current ====
    unit!("ampere", "current", "A", "ampere", "amperes", &["amp", "amps"], Conv::Linear(1.0), PrefixRule::Si, true),
    // ==== Luminous intensity ====
    unit!("candela", "luminous_intensity", "cd", "candela", "candelas", &[], Conv::Linear(1.0), PrefixRule::Si, true),
    // ==== Dimensionless ====
    unit!("unitless", "dimensionless", "", "", "", &[], Conv::Linear(1.0), PrefixRule::None, true),
    unit!("percent", "dimensionless", "%", "percent", "percent", &[], Conv::Linear(0.01), PrefixRule::None, false),
    unit!("permille", "dimensionless", "‰", "permille", "permille", &[], Conv::Linear(0.001), PrefixRule::None, false),
    unit!("ppm", "dimensionless", "ppm", "part per million", "parts per million", &[], Conv::Linear(1.0e-6), PrefixRule::None, false),
    unit!("dozen", "dimensionless", "doz", "dozen", "dozens", &[], Conv::Linear(12.0), PrefixRule::None, false),
    // ==== Angle ====
    unit!("cycle", "cycle", "cyc", "cycle", "cycles", &["turn", "turns", "revolution", "revolutions", "rev"], Conv::Linear(1.0), PrefixRule::None, true),
    unit!("radian", "cycle", "rad", "radian", "radians", &[], Conv::Linear(1.0 / core::f64::consts::TAU), PrefixRule::None, false),
    unit!("degree", "cycle", "°", "degree", "degrees", &["deg"], Conv::Linear(1.0 / 360.0), PrefixRule::None, false),
    unit!("arcminute", "cycle", "arcmin", "arcminute", "arcminutes", &["'", "′"], Conv::Linear(1.0 / 21600.0), PrefixRule::None, false),
    unit!("arcsecond", "cycle", "arcsec", "arcsecond", "arcseconds", &["\"", "″"], Conv::Linear(1.0 / 1296000.0), PrefixRule::None, false),
    unit!("gradian", "cycle", "grad", "gradian", "gradians", &["gon"], Conv::Linear(1.0 / 400.0), PrefixRule::None, false),
    // ==== Frequency ====
    unit!("hertz", "frequency", "Hz", "hertz", "hertz", &[], Conv::Linear(1.0), PrefixRule::Si, true),
    unit!("rpm", "frequency", "rpm", "revolution per minute", "revolutions per minute", &[], Conv::Linear(1.0 / 60.0), PrefixRule::None, false),
    // ==== Beat / tempo ====
    unit!("beat", "beat", "beat", "beat", "beats", &[], Conv::Linear(1.0), PrefixRule::None, true),
    unit!("beat_per_second", "tempo", "bps", "beat per second", "beats per second", &[], Conv::Linear(1.0), PrefixRule::None, true),
    unit!("bpm", "tempo", "bpm", "beat per minute", "beats per minute", &[], Conv::Linear(1.0 / 60.0), PrefixRule::None, false),
    // ==== Operations / compute ====
    unit!("operation", "operation", "op", "operation", "operations", &["flop"], Conv::Linear(1.0), PrefixRule::None, true),
    unit!("flops", "compute_rate", "FLOPS", "flops", "flops", &[], Conv::Linear(1.0), PrefixRule::SiFromKilo, true),
    // ==== Printing ====
    unit!("dot", "printing", "dot", "dot", "dots", &[], Conv::Linear(1.0), PrefixRule::None, true),
    unit!("pixel", "printing", "px", "pixel", "pixels", &[], Conv::Linear(1.0), PrefixRule::None, false),
    unit!("dot_per_meter", "pixel_density", "dpm", "dot per meter", "dots per meter", &[], Conv::Linear(1.0), PrefixRule::None, true),
    unit!("dpi", "pixel_density", "dpi", "dot per inch", "dots per inch", &[], Conv::Linear(1.0 / 0.0254), PrefixRule::None, false),
    unit!("ppi", "pixel_density", "ppi", "pixel per inch", "pixels per inch", &[], Conv::Linear(1.0 / 0.0254), PrefixRule::None, false),
    // ==== Data ====
    unit!("bit", "data", "b", "bit", "bits", &[], Conv::Linear(1.0), PrefixRule::SiFromKiloAndBinary, true),
    unit!("byte", "data", "B", "byte", "bytes", &[], Conv::Linear(8.0), PrefixRule::SiFromKiloAndBinary, false),
    // ==== Area ====
    unit!("square_meter", "area", "sqm", "square meter", "square meters", &["square metre", "square metres"], Conv::Linear(1.0), PrefixRule::None, true),
    unit!("are", "area", "a", "are", "ares", &[], Conv::Linear(100.0), PrefixRule::None, false),
    unit!("hectare", "area", "ha", "hectare", "hectares", &[], Conv::Linear(1.0e4), PrefixRule::None, false),
    unit!("acre", "area", "ac", "acre", "acres", &[], Conv::Linear(4046.8564224), PrefixRule::None, false),
    // ==== Volume ====
    unit!("cubic_meter", "volume", "cbm", "cubic meter", "cubic meters", &["cubic metre", "cubic metres"], Conv::Linear(1.0), PrefixRule::None, true),
    unit!("liter", "volume", "l", "liter", "liters", &["litre", "litres", "L"], Conv::Linear(0.001), PrefixRule::Si, false),
    unit!("gallon", "volume", "gal", "gallon", "gallons", &[], Conv::Variant { us: 0.003785411784, uk: 0.00454609 }, PrefixRule::None, false),
    unit!("quart", "volume", "qt", "quart", "quarts", &[], Conv::Variant { us: 0.000946352946, uk: 0.0011365225 }, PrefixRule::None, false),
    unit!("pint", "volume", "pt", "pint", "pints", &[], Conv::Variant { us: 0.000473176473, uk: 0.00056826125 }, PrefixRule::None, false),
    unit!("cup", "volume", "cp", "cup", "cups", &[], Conv::Variant { us: 0.0002365882365, uk: 0.000284130625 }, PrefixRule::None, false),
    unit!("fluid_ounce", "volume", "floz", "fluid ounce", "fluid ounces", &["fl oz"], Conv::Variant { us: 2.95735295625e-5, uk: 2.84130625e-5 }, PrefixRule::None, false),
    unit!("tablespoon", "volume", "tbsp", "tablespoon", "tablespoons", &[], Conv::Variant { us: 1.478676478125e-5, uk: 1.77581640625e-5 }, PrefixRule::None, false),
    unit!("teaspoon", "volume", "tsp", "teaspoon", "teaspoons", &[], Conv::Variant { us: 4.92892159375e-6, uk: 5.9193880208333e-6 }, PrefixRule::None, false),
    // ==== Speed ====
    unit!("meter_per_second", "speed", "mps", "meter per second", "meters per second", &[], Conv::Linear(1.0), PrefixRule::None, true),
    unit!("kph", "speed", "kph", "kilometer per hour", "kilometers per hour", &["kmh"], Conv::Linear(1.0 / 3.6), PrefixRule::None, false),
    unit!("mph", "speed", "mph", "mile per hour", "miles per hour", &[], Conv::Linear(0.44704), PrefixRule::None, false),
    unit!("knot", "speed", "kn", "knot", "knots", &["kt"], Conv::Linear(1852.0 / 3600.0), PrefixRule::None, false),
    // ==== Force ====
    unit!("newton", "force", "N", "newton", "newtons", &[], Conv::Linear(1.0), PrefixRule::Si, true),
    unit!("pound_force", "force", "lbf", "pound-force", "pounds-force", &[], Conv::Linear(4.4482216152605), PrefixRule::None, false),
    // ==== Energy ====
    unit!("joule", "energy", "J", "joule", "joules", &[], Conv::Linear(1.0), PrefixRule::Si, true),
    unit!("calorie", "energy", "cal", "calorie", "calories", &[], Conv::Linear(4.184), PrefixRule::SiFromKilo, false),
    UnitDecl {
        id: "watt_hour",
        dimension: "energy",
        symbol: "Wh",
        singular: "watt hour",
        plural: "watt hours",
        aliases: &["watt-hour", "watt-hours"],
        conversion: Conv::Linear(3600.0),
        prefixes: PrefixRule::SiFromKilo,
        is_base: false,
        count_as_terms: 2,
    },
    unit!("electronvolt", "energy", "eV", "electronvolt", "electronvolts", &[], Conv::Linear(1.602176634e-19), PrefixRule::Si, false),
    unit!("btu", "energy", "BTU", "British thermal unit", "British thermal units", &[], Conv::Linear(1055.05585262), PrefixRule::None, false),
    // ==== Power ====
    unit!("watt", "power", "W", "watt", "watts", &[], Conv::Linear(1.0), PrefixRule::Si, true),
    unit!("horsepower", "power", "hp", "horsepower", "horsepower", &[], Conv::Linear(745.69987158227022), PrefixRule::None, false),
    // ==== Pressure ====
    unit!("pascal", "pressure", "Pa", "pascal", "pascals", &[], Conv::Linear(1.0), PrefixRule::Si, true),
    unit!("bar", "pressure", "bar", "bar", "bars", &[], Conv::Linear(1.0e5), PrefixRule::None, false),
    unit!("atmosphere", "pressure", "atm", "atmosphere", "atmospheres", &[], Conv::Linear(101325.0), PrefixRule::None, false),
    unit!("psi", "pressure", "psi", "pound per square inch", "pounds per square inch", &[], Conv::Linear(6894.757293168361), PrefixRule::None, false),
    unit!("torr", "pressure", "Torr", "torr", "torr", &["mmHg"], Conv::Linear(133.32236842105263), PrefixRule::None, false),
    // ==== Currency base ====
    unit!("usd", "currency", "USD", "US dollar", "US dollars", &[], Conv::Linear(1.0), PrefixRule::None, true),
];

fn push_names(names: &mut Vec<String>, candidates: &[&str]) {
    for candidate in candidates {
        if !candidate.is_empty() && !names.iter().any(|n| n == candidate) {
            names.push((*candidate).to_string());
        }
    }
}

fn base_unit_data(decl: &UnitDecl) -> UnitData {
    let mut names = Vec::new();
    push_names(&mut names, &[decl.symbol, decl.singular, decl.plural]);
    push_names(&mut names, decl.aliases);
    UnitData {
        id: decl.id.to_string(),
        dimension: decl.dimension.to_string(),
        display_name: DisplayName {
            symbol: decl.symbol.to_string(),
            singular: decl.singular.to_string(),
            plural: decl.plural.to_string(),
        },
        names,
        conversion: decl.conversion.into_data(),
        is_base_unit: decl.is_base,
        count_as_terms: (decl.count_as_terms > 1).then_some(decl.count_as_terms),
    }
}

fn prefixed_unit_data(decl: &UnitDecl, prefix: &Prefix, factor: f64) -> UnitData {
    let base = match decl.conversion {
        Conv::Linear(f) => f,
        // Prefixes are only declared on linear units.
        Conv::Affine { factor: f, .. } | Conv::Variant { us: f, .. } => f,
    };
    let symbol = format!("{}{}", prefix.symbol, decl.symbol);
    let singular = format!("{}{}", prefix.name, decl.singular);
    let plural = format!("{}{}", prefix.name, decl.plural);
    let mut names = Vec::new();
    push_names(&mut names, &[symbol.as_str(), singular.as_str(), plural.as_str()]);
    if prefix.name == "micro" {
        // µ has an ASCII spelling.
        let ascii = format!("u{}", decl.symbol);
        push_names(&mut names, &[ascii.as_str()]);
    }
    if prefix.name == "deca" {
        let deka = format!("deka{}", decl.singular);
        push_names(&mut names, &[deka.as_str()]);
    }
    for alias in decl.aliases {
        // Short aliases read as symbols (L → mL), long ones as words
        // (litre → millilitre).
        let prefixed = if alias.len() <= 2 {
            format!("{}{}", prefix.symbol, alias)
        } else {
            format!("{}{}", prefix.name, alias)
        };
        push_names(&mut names, &[prefixed.as_str()]);
    }
    UnitData {
        id: format!("{}{}", prefix.name, decl.id),
        dimension: decl.dimension.to_string(),
        display_name: DisplayName {
            symbol: symbol.clone(),
            singular,
            plural,
        },
        names,
        conversion: ConversionData::Linear {
            factor: base * factor,
        },
        is_base_unit: false,
        count_as_terms: (decl.count_as_terms > 1).then_some(decl.count_as_terms),
    }
}

/// Expands the compact catalogue into the full unit database.
#[must_use]
pub fn unit_database() -> UnitDatabase {
    let dimensions = DIMENSIONS
        .iter()
        .map(|d| DimensionData {
            id: d.id.to_string(),
            name: d.name.to_string(),
            base_unit: d.base_unit.to_string(),
            derived_from: d
                .derived
                .iter()
                .map(|&(dim, exp)| DimensionFactor {
                    dimension: dim.to_string(),
                    exponent: exp,
                })
                .collect(),
            has_named_units: d.has_named_units,
        })
        .collect();

    let mut units = Vec::new();
    for decl in UNITS {
        units.push(base_unit_data(decl));
        match decl.prefixes {
            PrefixRule::None => {}
            PrefixRule::Si => {
                for prefix in SI_PREFIXES {
                    units.push(prefixed_unit_data(decl, prefix, 10f64.powi(prefix.power)));
                }
            }
            PrefixRule::SiFromKilo => {
                for prefix in SI_PREFIXES.iter().filter(|p| p.power >= 3) {
                    units.push(prefixed_unit_data(decl, prefix, 10f64.powi(prefix.power)));
                }
            }
            PrefixRule::SiFromKiloAndBinary => {
                for prefix in SI_PREFIXES.iter().filter(|p| p.power >= 3) {
                    units.push(prefixed_unit_data(decl, prefix, 10f64.powi(prefix.power)));
                }
                for prefix in BINARY_PREFIXES {
                    units.push(prefixed_unit_data(decl, prefix, 2f64.powi(prefix.power)));
                }
            }
        }
    }
    UnitDatabase { dimensions, units }
}

struct CurrencyDecl {
    code: &'static str,
    minor_units: u8,
    singular: &'static str,
    plural: &'static str,
    names: &'static [&'static str],
}

const CURRENCIES: &[CurrencyDecl] = &[
    CurrencyDecl { code: "USD", minor_units: 2, singular: "US dollar", plural: "US dollars", names: &["dollar", "dollars", "buck", "bucks"] },
    CurrencyDecl { code: "EUR", minor_units: 2, singular: "euro", plural: "euros", names: &["euro", "euros", "€"] },
    CurrencyDecl { code: "GBP", minor_units: 2, singular: "pound sterling", plural: "pounds sterling", names: &["pound sterling", "quid", "£"] },
    CurrencyDecl { code: "JPY", minor_units: 0, singular: "Japanese yen", plural: "Japanese yen", names: &["yen"] },
    CurrencyDecl { code: "CNY", minor_units: 2, singular: "Chinese yuan", plural: "Chinese yuan", names: &["yuan", "renminbi"] },
    CurrencyDecl { code: "CHF", minor_units: 2, singular: "Swiss franc", plural: "Swiss francs", names: &["franc", "francs"] },
    CurrencyDecl { code: "CAD", minor_units: 2, singular: "Canadian dollar", plural: "Canadian dollars", names: &["canadian dollar", "canadian dollars"] },
    CurrencyDecl { code: "AUD", minor_units: 2, singular: "Australian dollar", plural: "Australian dollars", names: &["australian dollar", "australian dollars"] },
    CurrencyDecl { code: "NZD", minor_units: 2, singular: "New Zealand dollar", plural: "New Zealand dollars", names: &[] },
    CurrencyDecl { code: "SEK", minor_units: 2, singular: "Swedish krona", plural: "Swedish kronor", names: &["krona", "kronor"] },
    CurrencyDecl { code: "NOK", minor_units: 2, singular: "Norwegian krone", plural: "Norwegian kroner", names: &["krone", "kroner"] },
    CurrencyDecl { code: "DKK", minor_units: 2, singular: "Danish krone", plural: "Danish kroner", names: &[] },
    CurrencyDecl { code: "PLN", minor_units: 2, singular: "Polish zloty", plural: "Polish zlotys", names: &["zloty", "zlotys"] },
    CurrencyDecl { code: "CZK", minor_units: 2, singular: "Czech koruna", plural: "Czech korunas", names: &["koruna", "korunas"] },
    CurrencyDecl { code: "HUF", minor_units: 2, singular: "Hungarian forint", plural: "Hungarian forints", names: &["forint", "forints"] },
    CurrencyDecl { code: "TRY", minor_units: 2, singular: "Turkish lira", plural: "Turkish liras", names: &["lira", "liras"] },
    CurrencyDecl { code: "INR", minor_units: 2, singular: "Indian rupee", plural: "Indian rupees", names: &["rupee", "rupees", "₹"] },
    CurrencyDecl { code: "KRW", minor_units: 0, singular: "South Korean won", plural: "South Korean won", names: &["won", "₩"] },
    CurrencyDecl { code: "SGD", minor_units: 2, singular: "Singapore dollar", plural: "Singapore dollars", names: &[] },
    CurrencyDecl { code: "HKD", minor_units: 2, singular: "Hong Kong dollar", plural: "Hong Kong dollars", names: &[] },
    CurrencyDecl { code: "TWD", minor_units: 2, singular: "New Taiwan dollar", plural: "New Taiwan dollars", names: &[] },
    CurrencyDecl { code: "THB", minor_units: 2, singular: "Thai baht", plural: "Thai baht", names: &["baht"] },
    CurrencyDecl { code: "MYR", minor_units: 2, singular: "Malaysian ringgit", plural: "Malaysian ringgits", names: &["ringgit", "ringgits"] },
    CurrencyDecl { code: "IDR", minor_units: 2, singular: "Indonesian rupiah", plural: "Indonesian rupiahs", names: &["rupiah", "rupiahs"] },
    CurrencyDecl { code: "PHP", minor_units: 2, singular: "Philippine peso", plural: "Philippine pesos", names: &[] },
    CurrencyDecl { code: "VND", minor_units: 0, singular: "Vietnamese dong", plural: "Vietnamese dong", names: &["dong", "₫"] },
    CurrencyDecl { code: "BRL", minor_units: 2, singular: "Brazilian real", plural: "Brazilian reais", names: &["real", "reais"] },
    CurrencyDecl { code: "MXN", minor_units: 2, singular: "Mexican peso", plural: "Mexican pesos", names: &["peso", "pesos"] },
    CurrencyDecl { code: "ZAR", minor_units: 2, singular: "South African rand", plural: "South African rand", names: &["rand"] },
    CurrencyDecl { code: "ILS", minor_units: 2, singular: "Israeli new shekel", plural: "Israeli new shekels", names: &["shekel", "shekels", "₪"] },
    CurrencyDecl { code: "AED", minor_units: 2, singular: "UAE dirham", plural: "UAE dirhams", names: &["dirham", "dirhams"] },
    CurrencyDecl { code: "SAR", minor_units: 2, singular: "Saudi riyal", plural: "Saudi riyals", names: &["riyal", "riyals"] },
    CurrencyDecl { code: "RUB", minor_units: 2, singular: "Russian ruble", plural: "Russian rubles", names: &["ruble", "rubles", "rouble", "roubles", "₽"] },
];

/// Symbols that denote "some" currency; each gets its own synthetic
/// dimension so two of them never silently inter-convert.
const AMBIGUOUS_SYMBOLS: &[(&str, &str)] = &[
    ("$", "currency_dollar_sign"),
    ("¥", "currency_yen_sign"),
    ("kr", "currency_kr_sign"),
];

/// The currency database.
#[must_use]
pub fn currency_database() -> CurrencyDatabase {
    CurrencyDatabase {
        unambiguous: CURRENCIES
            .iter()
            .map(|decl| CurrencyData {
                code: decl.code.to_string(),
                minor_units: decl.minor_units,
                display_name: CurrencyDisplayName {
                    singular: decl.singular.to_string(),
                    plural: decl.plural.to_string(),
                },
                names: decl.names.iter().map(|n| (*n).to_string()).collect(),
            })
            .collect(),
        ambiguous: AMBIGUOUS_SYMBOLS
            .iter()
            .map(|&(symbol, dimension)| AmbiguousSymbolData {
                symbol: symbol.to_string(),
                dimension: dimension.to_string(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_generates_si_prefixes() {
        let db = unit_database();
        let km = db.units.iter().find(|u| u.id == "kilometer").unwrap();
        assert_eq!(km.conversion, ConversionData::Linear { factor: 1000.0 });
        assert!(km.names.iter().any(|n| n == "km"));

        // am/pm exist as attometer/picometer; the lexer later
        // disambiguates them against time indicators.
        assert!(db.units.iter().any(|u| u.id == "attometer"));
        assert!(db.units.iter().any(|u| u.id == "picometer"));
    }

    #[test]
    fn bit_and_byte_carry_binary_prefixes_and_si_from_kilo() {
        let db = unit_database();
        let kib = db.units.iter().find(|u| u.id == "kibibit").unwrap();
        assert_eq!(kib.conversion, ConversionData::Linear { factor: 1024.0 });
        let mib = db.units.iter().find(|u| u.id == "mebibyte").unwrap();
        assert_eq!(
            mib.conversion,
            ConversionData::Linear {
                factor: 8.0 * 1024.0 * 1024.0
            }
        );
        // No sub-kilo SI prefixes on data units.
        assert!(!db.units.iter().any(|u| u.id == "millibit"));
    }

    #[test]
    fn watt_hour_prefixes_keep_term_count() {
        let db = unit_database();
        let kwh = db.units.iter().find(|u| u.id == "kilowatt_hour").unwrap();
        assert_eq!(kwh.count_as_terms, Some(2));
        assert!(kwh.names.iter().any(|n| n == "kWh"));
    }

    #[test]
    fn prime_glyphs_stay_within_the_allowlist() {
        let db = unit_database();
        let mut primes = 0;
        let mut double_primes = 0;
        for unit in &db.units {
            primes += usize::from(unit.names.iter().any(|n| n == "'"));
            double_primes += usize::from(unit.names.iter().any(|n| n == "\""));
        }
        assert_eq!(primes, 2); // foot and arcminute
        assert_eq!(double_primes, 2); // inch and arcsecond
    }

    #[test]
    fn flops_variants_are_generated() {
        let db = unit_database();
        assert!(db.units.iter().any(|u| u.id == "gigaflops"));
        let tflops = db.units.iter().find(|u| u.id == "teraflops").unwrap();
        assert_eq!(tflops.conversion, ConversionData::Linear { factor: 1.0e12 });
    }
}
