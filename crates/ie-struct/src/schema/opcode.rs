//! Effect opcode table.
//!
//! The opcode is the discriminant of an effect record. It selects how the
//! two generic parameters, the resource reference and (on Enhanced Edition
//! builds) the special field are split and named. Offsets never depend on
//! the opcode; only names and kinds do.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::config::GameConfig;
use crate::error::DecodeError;
use crate::model::{FieldKind, Width};
use crate::schema::FieldSpec;

/// Schema of one opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeDef {
    pub name: &'static str,
    /// Fields covering parameter 1; empty for the generic layout.
    pub param1: &'static [FieldSpec],
    /// Fields covering parameter 2; empty for the generic layout.
    pub param2: &'static [FieldSpec],
    /// Resource reference, when the opcode uses one.
    pub resource: Option<FieldSpec>,
    /// Meaning of the special field on Enhanced Edition builds.
    pub special: Option<FieldSpec>,
}

const GENERIC_PARAM1: &[FieldSpec] = &[FieldSpec::new("Parameter 1", FieldKind::Unsigned(Width::Dword))];
const GENERIC_PARAM2: &[FieldSpec] = &[FieldSpec::new("Parameter 2", FieldKind::Unsigned(Width::Dword))];
const GENERIC_RESOURCE: FieldSpec = FieldSpec::new("Resource", FieldKind::ResRef(&[]));
const GENERIC_SPECIAL: FieldSpec = FieldSpec::new("Special", FieldKind::Unsigned(Width::Dword));

/// Layout used for opcodes the table does not describe.
pub const UNKNOWN: OpcodeDef = OpcodeDef::generic("Unknown");

impl OpcodeDef {
    const fn generic(name: &'static str) -> Self {
        Self {
            name,
            param1: &[],
            param2: &[],
            resource: None,
            special: None,
        }
    }

    pub fn param1(&self) -> &'static [FieldSpec] {
        if self.param1.is_empty() { GENERIC_PARAM1 } else { self.param1 }
    }

    pub fn param2(&self) -> &'static [FieldSpec] {
        if self.param2.is_empty() { GENERIC_PARAM2 } else { self.param2 }
    }

    pub fn resource(&self) -> FieldSpec {
        self.resource.unwrap_or(GENERIC_RESOURCE)
    }

    /// The special field; classic builds always see it as a plain number.
    pub fn special(&self, config: &GameConfig) -> FieldSpec {
        match self.special {
            Some(spec) if config.is_enhanced() => spec,
            _ => GENERIC_SPECIAL,
        }
    }
}

const MODIFIER_TYPES: &[&str] = &["Increment", "Set", "Set %"];

const VALUE: FieldSpec = FieldSpec::new("Value", FieldKind::Signed(Width::Dword));
const MODIFIER: FieldSpec = FieldSpec::new("Modifier type", FieldKind::Enum(Width::Dword, MODIFIER_TYPES));
const STAT_PARAM1: &[FieldSpec] = &[VALUE];
const STAT_PARAM2: &[FieldSpec] = &[MODIFIER];

const DAMAGE_TYPES: &[&str] = &[
    "Acid",
    "Cold",
    "Electricity",
    "Fire",
    "Piercing",
    "Poison",
    "Magic",
    "Missile",
    "Slashing",
    "Magic fire",
    "Magic cold",
    "Stunning",
];

const IDS_FILES: &[&str] = &[
    "",
    "",
    "EA.IDS",
    "GENERAL.IDS",
    "RACE.IDS",
    "CLASS.IDS",
    "SPECIFIC.IDS",
    "GENDER.IDS",
    "ALIGNMENT.IDS",
];

const fn stat(name: &'static str) -> OpcodeDef {
    OpcodeDef {
        name,
        param1: STAT_PARAM1,
        param2: STAT_PARAM2,
        resource: None,
        special: None,
    }
}

const TABLE: &[(u32, OpcodeDef)] = &[
    (
        0,
        OpcodeDef {
            param1: &[FieldSpec::new("AC value", FieldKind::Signed(Width::Dword))],
            param2: &[FieldSpec::new(
                "Bonus to",
                FieldKind::Flags(
                    Width::Dword,
                    &["Crushing", "Missile", "Piercing", "Slashing", "Set base AC"],
                ),
            )],
            ..OpcodeDef::generic("AC bonus")
        },
    ),
    (1, stat("Modify attacks per round")),
    (
        7,
        OpcodeDef {
            param1: &[
                FieldSpec::new("Color", FieldKind::Unsigned(Width::Byte)),
                FieldSpec::new("Unused", FieldKind::Raw(3)),
            ],
            param2: &[FieldSpec::new("Location", FieldKind::Hex(Width::Dword))],
            ..OpcodeDef::generic("Set color")
        },
    ),
    (
        12,
        OpcodeDef {
            param1: &[FieldSpec::new("Amount", FieldKind::Signed(Width::Dword))],
            param2: &[
                FieldSpec::new(
                    "Mode",
                    FieldKind::Enum(Width::Word, &["Normal", "Set to value", "Set to %", "Percentage"]),
                ),
                FieldSpec::new("Damage type", FieldKind::Flags(Width::Word, DAMAGE_TYPES)),
            ],
            special: Some(FieldSpec::new(
                "Damage flags",
                FieldKind::Flags(
                    Width::Dword,
                    &["Drain HP", "Transfer HP", "Fist damage only", "Drain HP (no limit)"],
                ),
            )),
            ..OpcodeDef::generic("Damage")
        },
    ),
    (
        17,
        OpcodeDef {
            param1: STAT_PARAM1,
            param2: &[
                FieldSpec::new("Modifier type", FieldKind::Enum(Width::Word, MODIFIER_TYPES)),
                FieldSpec::new("Heal flags", FieldKind::Flags(Width::Word, &["Raise dead", "Remove limited effects"])),
            ],
            ..OpcodeDef::generic("Current HP bonus")
        },
    ),
    (18, stat("Maximum HP bonus")),
    (
        25,
        OpcodeDef {
            param1: &[FieldSpec::new("Amount", FieldKind::Signed(Width::Dword))],
            param2: &[FieldSpec::new(
                "Poison type",
                FieldKind::Enum(
                    Width::Dword,
                    &[
                        "1 damage per second",
                        "1 damage per second",
                        "Amount damage per second",
                        "1 damage per amount seconds",
                        "Parameter 3 damage per amount seconds",
                    ],
                ),
            )],
            ..OpcodeDef::generic("Poison")
        },
    ),
    (44, stat("Strength bonus")),
    (54, stat("Base THAC0 bonus")),
    (
        58,
        OpcodeDef {
            param1: &[FieldSpec::new("Level", FieldKind::Unsigned(Width::Dword))],
            param2: &[FieldSpec::new(
                "Dispel type",
                FieldKind::Enum(Width::Dword, &["Always dispel", "Use caster level", "Use specific level"]),
            )],
            ..OpcodeDef::generic("Dispel effects")
        },
    ),
    (
        67,
        OpcodeDef {
            param1: &[FieldSpec::new("# creatures", FieldKind::Unsigned(Width::Dword))],
            param2: &[FieldSpec::new(
                "Allegiance",
                FieldKind::Enum(Width::Dword, &["Match target", "Match target", "From CRE file", "Match target", "From CRE file", "Hostile"]),
            )],
            resource: Some(FieldSpec::new("Creature", FieldKind::ResRef(&["CRE"]))),
            ..OpcodeDef::generic("Summon creature")
        },
    ),
    (
        101,
        OpcodeDef {
            param2: &[FieldSpec::new("Effect", FieldKind::Unsigned(Width::Dword))],
            ..OpcodeDef::generic("Protection from opcode")
        },
    ),
    (
        139,
        OpcodeDef {
            param1: &[FieldSpec::new("String", FieldKind::StrRef)],
            ..OpcodeDef::generic("Display string")
        },
    ),
    (
        146,
        OpcodeDef {
            param1: &[FieldSpec::new("Cast at level", FieldKind::Unsigned(Width::Dword))],
            param2: &[FieldSpec::new(
                "Mode",
                FieldKind::Enum(
                    Width::Dword,
                    &["Cast normally", "Cast instantly (ignore level)", "Cast instantly (caster level)"],
                ),
            )],
            resource: Some(FieldSpec::new("Spell", FieldKind::ResRef(&["SPL"]))),
            ..OpcodeDef::generic("Cast spell")
        },
    ),
    (
        177,
        OpcodeDef {
            param1: &[FieldSpec::new("IDS value", FieldKind::Unsigned(Width::Dword))],
            param2: &[FieldSpec::new("IDS target", FieldKind::Enum(Width::Dword, IDS_FILES))],
            resource: Some(FieldSpec::new("Effect", FieldKind::ResRef(&["EFF"]))),
            ..OpcodeDef::generic("Use EFF file")
        },
    ),
    (
        206,
        OpcodeDef {
            param1: &[FieldSpec::new("String", FieldKind::StrRef)],
            resource: Some(FieldSpec::new("Spell", FieldKind::ResRef(&["SPL"]))),
            ..OpcodeDef::generic("Protection from spell")
        },
    ),
    (
        233,
        OpcodeDef {
            param1: &[FieldSpec::new("# stars", FieldKind::Unsigned(Width::Dword))],
            param2: &[FieldSpec::new("Proficiency", FieldKind::Unsigned(Width::Dword))],
            ..OpcodeDef::generic("Modify proficiencies")
        },
    ),
    (
        318,
        OpcodeDef {
            resource: Some(FieldSpec::new("Resource", FieldKind::ResRef(&["SPL", "ITM", "EFF"]))),
            ..OpcodeDef::generic("Protection from resource")
        },
    ),
];

lazy_static! {
    static ref OPCODES: FxHashMap<u32, OpcodeDef> = TABLE.iter().copied().collect();
}

/// Resolves the schema for `opcode` under `config`.
///
/// Opcodes above the configuration's maximum are rejected, which keeps
/// Enhanced Edition opcodes out of classic records. Opcodes within range
/// that the table does not describe get the generic layout.
pub fn resolve(opcode: u32, config: &GameConfig) -> Result<&'static OpcodeDef, DecodeError> {
    let max = config.max_opcode();
    if opcode > max {
        return Err(DecodeError::UnknownOpcode { opcode, max });
    }
    Ok(OPCODES.get(&opcode).unwrap_or(&UNKNOWN))
}

/// Name of a known opcode, regardless of engine.
pub fn name(opcode: u32) -> Option<&'static str> {
    OPCODES.get(&opcode).map(|def| def.name)
}
