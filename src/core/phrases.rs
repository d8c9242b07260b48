//! Fixed phrase and negation tables for match/concern reasons.
//!
//! Reasons are always drawn from these tables, never generated, so a given
//! input always produces the same strings.

/// Canonical key for one reason chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhraseKey {
    WithinRadius,
    OutsideRadius,
    SizeMatch,
    SizeTooBig,
    SizeTooSmall,
    AgeMatch,
    AgeTooYoung,
    AgeTooOld,
    CalmCompanion,
    GoodEnergyFit,
    HighEnergy,
    Quiet,
    Vocal,
    KidFriendly,
    NotKidFriendly,
    ApartmentOk,
    NeedsSpace,
    TemperamentFit,
}

impl PhraseKey {
    /// Literal output string for this key
    pub fn text(self) -> &'static str {
        match self {
            PhraseKey::WithinRadius => "within your search area",
            PhraseKey::OutsideRadius => "outside your search radius",
            PhraseKey::SizeMatch => "the size you're looking for",
            PhraseKey::SizeTooBig => "bigger than your preferred size",
            PhraseKey::SizeTooSmall => "smaller than your preferred size",
            PhraseKey::AgeMatch => "age fits what you're looking for",
            PhraseKey::AgeTooYoung => "younger than you wanted",
            PhraseKey::AgeTooOld => "older than you wanted",
            PhraseKey::CalmCompanion => "calm, low-key companion",
            PhraseKey::GoodEnergyFit => "energy level suits your lifestyle",
            PhraseKey::HighEnergy => "high energy, needs an active home",
            PhraseKey::Quiet => "quiet around the house",
            PhraseKey::Vocal => "known to be vocal",
            PhraseKey::KidFriendly => "good with children",
            PhraseKey::NotKidFriendly => "not recommended around children",
            PhraseKey::ApartmentOk => "comfortable in an apartment",
            PhraseKey::NeedsSpace => "needs room to roam",
            PhraseKey::TemperamentFit => "temperament matches what you're looking for",
        }
    }
}

/// Semantically opposite (match, concern) claims.
///
/// When the concern side is present for a candidate, the match side is
/// dropped before results surface: the concern is the more conservative
/// claim. The validator treats any surviving pair as an invariant violation.
pub const NEGATION_PAIRS: &[(PhraseKey, PhraseKey)] = &[
    (PhraseKey::Quiet, PhraseKey::Vocal),
    (PhraseKey::CalmCompanion, PhraseKey::HighEnergy),
    (PhraseKey::KidFriendly, PhraseKey::NotKidFriendly),
    (PhraseKey::ApartmentOk, PhraseKey::NeedsSpace),
    (PhraseKey::SizeMatch, PhraseKey::SizeTooBig),
    (PhraseKey::SizeMatch, PhraseKey::SizeTooSmall),
    (PhraseKey::AgeMatch, PhraseKey::AgeTooYoung),
    (PhraseKey::AgeMatch, PhraseKey::AgeTooOld),
    (PhraseKey::WithinRadius, PhraseKey::OutsideRadius),
];
