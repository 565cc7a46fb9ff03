/// Trail steps the backend knows how to filter its knowledge base by.
///
/// The chat and upload forms send the wire key (`as_str`); anything else the
/// user types is passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    All,
    Diagnostic,
    Icp,
    Persona,
    Funnel,
    Goals,
    Brand,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::All => "todas",
            Step::Diagnostic => "diagnostico",
            Step::Icp => "icp",
            Step::Persona => "persona",
            Step::Funnel => "funil",
            Step::Goals => "metas",
            Step::Brand => "marca",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "todas" => Some(Step::All),
            "diagnostico" => Some(Step::Diagnostic),
            "icp" => Some(Step::Icp),
            "persona" => Some(Step::Persona),
            "funil" => Some(Step::Funnel),
            "metas" => Some(Step::Goals),
            "marca" => Some(Step::Brand),
            _ => None,
        }
    }

    pub fn all() -> Vec<Step> {
        vec![
            Step::All,
            Step::Diagnostic,
            Step::Icp,
            Step::Persona,
            Step::Funnel,
            Step::Goals,
            Step::Brand,
        ]
    }

    /// Steps an admin can file uploaded material under (everything but `All`).
    pub fn uploadable() -> Vec<Step> {
        Self::all().into_iter().filter(|s| *s != Step::All).collect()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Step::All => "All steps",
            Step::Diagnostic => "Diagnostic",
            Step::Icp => "ICP",
            Step::Persona => "Persona",
            Step::Funnel => "Funnel",
            Step::Goals => "Goals",
            Step::Brand => "Brand",
        }
    }

    /// Next entry in `steps`, wrapping around. Unknown keys start at the first
    /// entry; `None` only when `steps` is empty.
    pub fn cycle(current: &str, steps: &[Step]) -> Option<Step> {
        let idx = steps
            .iter()
            .position(|s| s.as_str() == current)
            .map(|i| (i + 1) % steps.len())
            .unwrap_or(0);
        steps.get(idx).copied()
    }
}

impl Default for Step {
    fn default() -> Self {
        Step::All
    }
}
