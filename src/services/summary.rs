use crate::models::{
    AvailabilityResult, BookQuery, ItemStatus, LocatedRecord, RetrievedAvailability, Verdict,
};

/// Branches named individually before the rest are collapsed into "+N more"
const LISTED_BRANCHES: usize = 3;

/// Settings the verdict wording depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryPolicy {
    /// Branch reported first when it has a copy on the shelf
    pub preferred_branch: String,
    /// Library name used in "not found" and "check online" details
    pub library_name: String,
}

impl SummaryPolicy {
    pub fn new(preferred_branch: impl Into<String>, library_name: impl Into<String>) -> Self {
        Self {
            preferred_branch: preferred_branch.into(),
            library_name: library_name.into(),
        }
    }

    fn is_preferred(&self, branch: &str) -> bool {
        branch.to_uppercase() == self.preferred_branch.to_uppercase()
    }
}

/// Title-cases a branch name the way catalog names are displayed
///
/// A letter is uppercased when it follows a non-letter and lowercased otherwise,
/// so "PARK BRANCH" becomes "Park Branch".
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut previous_cased = false;

    for c in name.chars() {
        let cased = c.is_uppercase() || c.is_lowercase();
        if cased && previous_cased {
            out.extend(c.to_lowercase());
        } else if cased {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        previous_cased = cased;
    }

    out
}

/// Reduces a lookup to a single verdict for the client
///
/// Precedence: no record identifier is `not_found` (the retrieval result is
/// ignored), a failed retrieval is `check_online`, any available copy is
/// `available`, and everything else is `in_use`. A record with zero copies in
/// total is still `in_use`.
pub fn summarize(
    query: &BookQuery,
    located: &LocatedRecord,
    retrieved: Option<&RetrievedAvailability>,
    policy: &SummaryPolicy,
) -> AvailabilityResult {
    let mut result = AvailabilityResult {
        title: query.title.clone(),
        author: query.author.clone(),
        status: Verdict::Unknown,
        detail: String::new(),
        url: located.url.clone(),
        holds: String::new(),
        preferred_branch_hit: false,
        branches_available: Vec::new(),
    };

    if located.id.is_none() {
        result.status = Verdict::NotFound;
        result.detail = format!("No results found at {}", policy.library_name);
        return result;
    }

    let Some(retrieved) = retrieved else {
        result.status = Verdict::CheckOnline;
        result.detail = format!(
            "Could not check availability - try the {} website",
            policy.library_name
        );
        return result;
    };

    let available_branches: Vec<String> = retrieved
        .branches
        .iter()
        .filter(|branch| branch.status == ItemStatus::Available)
        .map(|branch| branch.branch_name.clone())
        .collect();

    let preferred_hit = available_branches
        .iter()
        .any(|branch| policy.is_preferred(branch));

    let summary = retrieved.summary;

    if summary.available_copies > 0 {
        result.status = Verdict::Available;
        result.detail = if preferred_hit {
            preferred_detail(policy, available_branches.len() - 1)
        } else {
            branch_list_detail(&available_branches)
        };
    } else {
        result.status = Verdict::InUse;
        if summary.held_copies > 0 {
            result.holds = format!(
                "{} holds on {} copies",
                summary.held_copies, summary.total_copies
            );
            result.detail = format!("All copies in use ({})", result.holds);
        } else {
            result.detail = "All copies checked out".to_string();
        }
    }

    result.preferred_branch_hit = preferred_hit;
    result.branches_available = available_branches;
    result
}

fn preferred_detail(policy: &SummaryPolicy, others: usize) -> String {
    let branch = title_case(&policy.preferred_branch);
    match others {
        0 => format!("At {}", branch),
        1 => format!("At {} +1 other branch", branch),
        n => format!("At {} +{} other branches", branch, n),
    }
}

fn branch_list_detail(branches: &[String]) -> String {
    let mut list = branches
        .iter()
        .take(LISTED_BRANCHES)
        .map(|branch| title_case(branch))
        .collect::<Vec<_>>()
        .join(", ");

    if branches.len() > LISTED_BRANCHES {
        list.push_str(&format!(" +{} more", branches.len() - LISTED_BRANCHES));
    }

    format!("Available at: {}", list)
}
