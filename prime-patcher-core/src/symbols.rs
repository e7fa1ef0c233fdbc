//! Per-build address tables.
//!
//! Every supported build exposes the same closed set of symbols; only the
//! addresses differ. The tables are constants checked at compile time, so a
//! table with a missing or repeated symbol does not build.
//!
//! Only the `g_GameState` addresses for `0-00` and `pal` are confirmed.
//! The other values are placeholders and must be checked against each
//! build's symbol map before an engine depends on them.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::version::{UnknownVersion, Version};

/// A routine or global the patch engine needs to locate in the game's DOL.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    GameState,
    StateManager,
    Main,
    ResFactory,
    SimplePool,
    TweakPlayer,
    TweakGame,
    OsReport,
    OsLink,
    PpcSetFpIeeeMode,
    WstringL,
    NewArray,
    DeleteArray,
    SetCurrentWorldId,
    ReInitializePowerUp,
    IncrPickup,
    DecrPickup,
    GetItemAmount,
    DrawWorld,
    UpdateHintState,
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error("unknown symbol: {0:?}")]
pub struct UnknownSymbol(pub String);

impl Symbol {
    pub const COUNT: usize = 20;

    /// In declaration order; `ALL[s as usize] == s` for every symbol.
    pub const ALL: [Symbol; Symbol::COUNT] = [
        Symbol::GameState,
        Symbol::StateManager,
        Symbol::Main,
        Symbol::ResFactory,
        Symbol::SimplePool,
        Symbol::TweakPlayer,
        Symbol::TweakGame,
        Symbol::OsReport,
        Symbol::OsLink,
        Symbol::PpcSetFpIeeeMode,
        Symbol::WstringL,
        Symbol::NewArray,
        Symbol::DeleteArray,
        Symbol::SetCurrentWorldId,
        Symbol::ReInitializePowerUp,
        Symbol::IncrPickup,
        Symbol::DecrPickup,
        Symbol::GetItemAmount,
        Symbol::DrawWorld,
        Symbol::UpdateHintState,
    ];

    /// The linker name, as it appears in the build's symbol map.
    pub fn name(self) -> &'static str {
        match self {
            Symbol::GameState => "g_GameState",
            Symbol::StateManager => "g_StateManager",
            Symbol::Main => "g_Main",
            Symbol::ResFactory => "g_ResFactory",
            Symbol::SimplePool => "g_SimplePool",
            Symbol::TweakPlayer => "g_tweakPlayer",
            Symbol::TweakGame => "g_tweakGame",
            Symbol::OsReport => "OSReport",
            Symbol::OsLink => "OSLink",
            Symbol::PpcSetFpIeeeMode => "PPCSetFpIEEEMode",
            Symbol::WstringL => "wstring_l__4rstlFPCw",
            Symbol::NewArray => "__nwa__FUlPCcPCc",
            Symbol::DeleteArray => "__dla__FPv",
            Symbol::SetCurrentWorldId => "SetCurrentWorldId__10CGameStateFUi",
            Symbol::ReInitializePowerUp => {
                "ReInitalizePowerUp__12CPlayerStateFQ212CPlayerState9EItemTypei"
            }
            Symbol::IncrPickup => "IncrPickup__12CPlayerStateFQ212CPlayerState9EItemTypei",
            Symbol::DecrPickup => "DecrPickup__12CPlayerStateFQ212CPlayerState9EItemTypei",
            Symbol::GetItemAmount => "GetItemAmount__12CPlayerStateCFQ212CPlayerState9EItemType",
            Symbol::DrawWorld => "DrawWorld__13CStateManagerCFv",
            Symbol::UpdateHintState => "UpdateHintState__13CStateManagerFf",
        }
    }
}

const _: () = {
    let mut i = 0;
    while i < Symbol::COUNT {
        assert!(Symbol::ALL[i] as usize == i);
        i += 1;
    }
};

impl FromStr for Symbol {
    type Err = UnknownSymbol;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Symbol::ALL
            .iter()
            .copied()
            .find(|s| s.name() == name)
            .ok_or_else(|| UnknownSymbol(name.to_string()))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type Addresses = [u32; Symbol::COUNT];

/// Lays `entries` out by symbol index. Evaluated at compile time: a repeated
/// symbol fails the build, and with exactly `COUNT` entries and no repeats
/// every symbol is covered.
const fn table(entries: [(Symbol, u32); Symbol::COUNT]) -> Addresses {
    let mut out = [0u32; Symbol::COUNT];
    let mut seen = [false; Symbol::COUNT];
    let mut i = 0;
    while i < Symbol::COUNT {
        let (symbol, address) = entries[i];
        let idx = symbol as usize;
        if seen[idx] {
            panic!("symbol listed twice in an address table");
        }
        seen[idx] = true;
        out[idx] = address;
        i += 1;
    }
    out
}

static NTSC_U_0_00: Addresses = table([
    (Symbol::GameState, 0x805A8C40),
    (Symbol::StateManager, 0x8045A1A8),
    (Symbol::Main, 0x805A8C38),
    (Symbol::ResFactory, 0x805A8C28),
    (Symbol::SimplePool, 0x805A8C24),
    (Symbol::TweakPlayer, 0x805A8D50),
    (Symbol::TweakGame, 0x805A8D58),
    (Symbol::OsReport, 0x8037F190),
    (Symbol::OsLink, 0x80382AF4),
    (Symbol::PpcSetFpIeeeMode, 0x80381B28),
    (Symbol::WstringL, 0x80329FA4),
    (Symbol::NewArray, 0x8031604C),
    (Symbol::DeleteArray, 0x80315F50),
    (Symbol::SetCurrentWorldId, 0x801D4B80),
    (Symbol::ReInitializePowerUp, 0x80091A74),
    (Symbol::IncrPickup, 0x80091B6C),
    (Symbol::DecrPickup, 0x80091CE0),
    (Symbol::GetItemAmount, 0x80091E64),
    (Symbol::DrawWorld, 0x80044FC8),
    (Symbol::UpdateHintState, 0x8004A0F8),
]);

static NTSC_U_0_01: Addresses = table([
    (Symbol::GameState, 0x805A8E20),
    (Symbol::StateManager, 0x8045A388),
    (Symbol::Main, 0x805A8E18),
    (Symbol::ResFactory, 0x805A8E08),
    (Symbol::SimplePool, 0x805A8E04),
    (Symbol::TweakPlayer, 0x805A8F30),
    (Symbol::TweakGame, 0x805A8F38),
    (Symbol::OsReport, 0x8037F2A4),
    (Symbol::OsLink, 0x80382C08),
    (Symbol::PpcSetFpIeeeMode, 0x80381C3C),
    (Symbol::WstringL, 0x8032A0B8),
    (Symbol::NewArray, 0x80316160),
    (Symbol::DeleteArray, 0x80316064),
    (Symbol::SetCurrentWorldId, 0x801D4C90),
    (Symbol::ReInitializePowerUp, 0x80091AF0),
    (Symbol::IncrPickup, 0x80091BE8),
    (Symbol::DecrPickup, 0x80091D5C),
    (Symbol::GetItemAmount, 0x80091EE0),
    // Unchanged from 0-00.
    (Symbol::DrawWorld, 0x80044FC8),
    (Symbol::UpdateHintState, 0x8004A0F8),
]);

static NTSC_U_0_02: Addresses = table([
    (Symbol::GameState, 0x805A9D00),
    (Symbol::StateManager, 0x8045B1E0),
    (Symbol::Main, 0x805A9CF8),
    (Symbol::ResFactory, 0x805A9CE8),
    (Symbol::SimplePool, 0x805A9CE4),
    (Symbol::TweakPlayer, 0x805A9E10),
    (Symbol::TweakGame, 0x805A9E18),
    (Symbol::OsReport, 0x8037FB60),
    (Symbol::OsLink, 0x803834C4),
    (Symbol::PpcSetFpIeeeMode, 0x803824F8),
    (Symbol::WstringL, 0x8032A95C),
    (Symbol::NewArray, 0x80316A1C),
    (Symbol::DeleteArray, 0x80316920),
    (Symbol::SetCurrentWorldId, 0x801D51B4),
    (Symbol::ReInitializePowerUp, 0x80091D38),
    (Symbol::IncrPickup, 0x80091E30),
    (Symbol::DecrPickup, 0x80091FA4),
    (Symbol::GetItemAmount, 0x80092128),
    (Symbol::DrawWorld, 0x80045140),
    (Symbol::UpdateHintState, 0x8004A270),
]);

static NTSC_K: Addresses = table([
    (Symbol::GameState, 0x805A8E40),
    (Symbol::StateManager, 0x8045A3A8),
    (Symbol::Main, 0x805A8E38),
    (Symbol::ResFactory, 0x805A8E28),
    (Symbol::SimplePool, 0x805A8E24),
    (Symbol::TweakPlayer, 0x805A8F50),
    (Symbol::TweakGame, 0x805A8F58),
    (Symbol::OsReport, 0x8037F4D8),
    (Symbol::OsLink, 0x80382E3C),
    (Symbol::PpcSetFpIeeeMode, 0x80381E70),
    (Symbol::WstringL, 0x8032A2EC),
    (Symbol::NewArray, 0x80316394),
    (Symbol::DeleteArray, 0x80316298),
    (Symbol::SetCurrentWorldId, 0x801D4EC4),
    (Symbol::ReInitializePowerUp, 0x80091B24),
    (Symbol::IncrPickup, 0x80091C1C),
    (Symbol::DecrPickup, 0x80091D90),
    (Symbol::GetItemAmount, 0x80091F14),
    (Symbol::DrawWorld, 0x80044FFC),
    (Symbol::UpdateHintState, 0x8004A12C),
]);

static NTSC_J: Addresses = table([
    (Symbol::GameState, 0x8059E180),
    (Symbol::StateManager, 0x80450E58),
    (Symbol::Main, 0x8059E178),
    (Symbol::ResFactory, 0x8059E168),
    (Symbol::SimplePool, 0x8059E164),
    (Symbol::TweakPlayer, 0x8059E290),
    (Symbol::TweakGame, 0x8059E298),
    (Symbol::OsReport, 0x8037A9C0),
    (Symbol::OsLink, 0x8037E324),
    (Symbol::PpcSetFpIeeeMode, 0x8037D358),
    (Symbol::WstringL, 0x803257D4),
    (Symbol::NewArray, 0x8031187C),
    (Symbol::DeleteArray, 0x80311780),
    (Symbol::SetCurrentWorldId, 0x801D1E2C),
    (Symbol::ReInitializePowerUp, 0x8008FE84),
    (Symbol::IncrPickup, 0x8008FF7C),
    (Symbol::DecrPickup, 0x800900F0),
    (Symbol::GetItemAmount, 0x80090274),
    (Symbol::DrawWorld, 0x80044C10),
    (Symbol::UpdateHintState, 0x80049D40),
]);

static PAL: Addresses = table([
    (Symbol::GameState, 0x8046AD44),
    (Symbol::StateManager, 0x803E2088),
    (Symbol::Main, 0x8046AD3C),
    (Symbol::ResFactory, 0x8046AD2C),
    (Symbol::SimplePool, 0x8046AD28),
    (Symbol::TweakPlayer, 0x8046AE54),
    (Symbol::TweakGame, 0x8046AE5C),
    (Symbol::OsReport, 0x80367D44),
    (Symbol::OsLink, 0x8036B6A8),
    (Symbol::PpcSetFpIeeeMode, 0x8036A6DC),
    (Symbol::WstringL, 0x80312B58),
    (Symbol::NewArray, 0x802FEC00),
    (Symbol::DeleteArray, 0x802FEB04),
    (Symbol::SetCurrentWorldId, 0x801C9A74),
    (Symbol::ReInitializePowerUp, 0x8008E414),
    (Symbol::IncrPickup, 0x8008E50C),
    (Symbol::DecrPickup, 0x8008E680),
    (Symbol::GetItemAmount, 0x8008E804),
    (Symbol::DrawWorld, 0x80043EA8),
    (Symbol::UpdateHintState, 0x80048FD8),
]);

fn addresses_for(version: Version) -> &'static Addresses {
    match version {
        Version::NtscU0_00 => &NTSC_U_0_00,
        Version::NtscU0_01 => &NTSC_U_0_01,
        Version::NtscU0_02 => &NTSC_U_0_02,
        Version::NtscK => &NTSC_K,
        Version::NtscJ => &NTSC_J,
        Version::Pal => &PAL,
    }
}

/// The address table for one build. Backed by static data, so copying it
/// around is free and it can be shared between threads without locking.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SymbolTable {
    version: Version,
    addresses: &'static Addresses,
}

impl SymbolTable {
    pub fn for_version(version: Version) -> SymbolTable {
        SymbolTable {
            version,
            addresses: addresses_for(version),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn address(&self, symbol: Symbol) -> u32 {
        self.addresses[symbol as usize]
    }

    /// Looks a symbol up by its linker name.
    pub fn get(&self, name: &str) -> Option<u32> {
        name.parse::<Symbol>().ok().map(|s| self.address(s))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        Symbol::ALL.into_iter().map(Symbol::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, u32)> {
        let addresses = self.addresses;
        Symbol::ALL
            .into_iter()
            .map(move |s| (s, addresses[s as usize]))
    }

    pub fn len(&self) -> usize {
        Symbol::COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Serialize for SymbolTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Symbol::COUNT))?;
        for (symbol, address) in self.iter() {
            map.serialize_entry(symbol.name(), &address)?;
        }
        map.end()
    }
}

impl Version {
    pub fn symbols(self) -> SymbolTable {
        SymbolTable::for_version(self)
    }
}

/// Returns the address table for the build identified by `tag`.
///
/// Only the fixed set of tags in [`Version::ALL`] is recognized; anything
/// else is an error, never a fallback to another build's table.
pub fn resolve(tag: &str) -> Result<SymbolTable, UnknownVersion> {
    let version: Version = tag.parse()?;
    Ok(version.symbols())
}

#[cfg(test)]
mod tests {
    use super::{resolve, Symbol, SymbolTable};
    use crate::version::{UnknownVersion, Version};
    use std::collections::BTreeSet;

    const MAIN_RAM: std::ops::Range<u32> = 0x8000_0000..0x8180_0000;

    fn key_set(table: &SymbolTable) -> BTreeSet<&'static str> {
        table.names().collect()
    }

    #[test]
    fn game_state_addresses() {
        let ntsc = resolve("0-00").unwrap();
        let pal = resolve("pal").unwrap();
        assert_eq!(ntsc.get("g_GameState"), Some(0x805A8C40));
        assert_eq!(pal.get("g_GameState"), Some(0x8046AD44));
        assert_eq!(key_set(&ntsc), key_set(&pal));
    }

    #[test]
    fn every_version_exposes_the_same_keys() {
        let reference = key_set(&Version::NtscU0_00.symbols());
        assert_eq!(reference.len(), Symbol::COUNT);
        for version in Version::ALL {
            let table = resolve(version.tag()).unwrap();
            assert_eq!(table.version(), version);
            assert_eq!(key_set(&table), reference, "{version}");
        }
    }

    #[test]
    fn resolve_is_stable() {
        for version in Version::ALL {
            let a = resolve(version.tag()).unwrap();
            let b = resolve(version.tag()).unwrap();
            assert_eq!(a, b);
            assert!(a.iter().eq(b.iter()));
        }
    }

    #[test]
    fn unknown_versions_are_rejected() {
        for tag in ["", "0-03", "PAL", "ntsc", " pal"] {
            assert_eq!(resolve(tag), Err(UnknownVersion(tag.to_string())));
        }
    }

    #[test]
    fn addresses_are_in_main_ram_and_distinct() {
        for version in Version::ALL {
            let table = version.symbols();
            let mut seen = BTreeSet::new();
            for (symbol, address) in table.iter() {
                assert!(MAIN_RAM.contains(&address), "{version} {symbol} {address:#010X}");
                assert!(seen.insert(address), "{version} reuses {address:#010X}");
            }
        }
    }

    #[test]
    fn builds_have_distinct_tables() {
        for (i, a) in Version::ALL.iter().enumerate() {
            for b in &Version::ALL[i + 1..] {
                assert_ne!(
                    a.symbols().address(Symbol::GameState),
                    b.symbols().address(Symbol::GameState),
                    "{a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn lookup_by_name_matches_lookup_by_symbol() {
        let table = Version::NtscJ.symbols();
        for symbol in Symbol::ALL {
            assert_eq!(table.get(symbol.name()), Some(table.address(symbol)));
        }
        assert_eq!(table.get("g_NotASymbol"), None);
    }

    #[test]
    fn serializes_as_name_map() {
        let value = serde_json::to_value(Version::Pal.symbols()).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), Symbol::COUNT);
        assert_eq!(map["g_GameState"], 0x8046AD44u32);
        assert_eq!(map["OSReport"], 0x80367D44u32);
    }
}
