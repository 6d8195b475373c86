//! Category keyword data for the prompt classifier.
//!
//! Tunable data, not logic - kept separate from the scoring algorithm in
//! `classifier.rs` so the lists can be edited without touching control flow.

use crate::classifier::Category;

pub struct CategoryDef {
    pub category: Category,
    /// Matched as substrings (weight 3 per occurrence).
    pub phrases: &'static [&'static str],
    /// Matched whole-word, except entries containing `&` which match as substrings
    /// (weight 1 per occurrence).
    pub words: &'static [&'static str],
}

/// Declaration order is the tie-break order: earlier category wins equal scores.
pub const CATEGORIES: &[CategoryDef] = &[
    CategoryDef {
        category: Category::CodeGeneration,
        phrases: &[
            "write a function",
            "write code",
            "fix this bug",
            "debug this",
            "refactor this",
            "unit test",
            "pull request",
            "code review",
            "stack trace",
            "null pointer",
        ],
        words: &[
            "code", "function", "bug", "compile", "compiler", "python", "rust", "javascript",
            "typescript", "golang", "api", "repository", "repo", "git", "commit", "branch",
            "class", "method", "variable", "loop", "array", "regex", "sql", "query", "script",
            "module", "import", "exception", "stacktrace", "runtime", "dependency", "endpoint",
            "cli", "terminal", "shell", "docker", "kubernetes", "deploy", "build", "test",
            "algorithm", "syntax",
        ],
    },
    CategoryDef {
        category: Category::DocumentCreation,
        phrases: &[
            "write a report",
            "draft a memo",
            "executive summary",
            "write an essay",
            "proofread this",
            "improve the wording",
            "table of contents",
        ],
        words: &[
            "document", "draft", "essay", "memo", "report", "outline", "paragraph", "summary",
            "proofread", "grammar", "wording", "manuscript", "narrative", "article", "blog",
            "newsletter", "whitepaper", "brochure", "copy", "edit", "editing", "rewrite",
            "tone", "audience", "caption",
        ],
    },
    CategoryDef {
        category: Category::BusinessDevelopment,
        phrases: &[
            "request for proposal",
            "statement of work",
            "government contract",
            "past performance",
            "capture strategy",
            "teaming agreement",
            "go to market",
        ],
        words: &[
            "proposal", "rfp", "rfi", "sow", "contract", "solicitation", "procurement",
            "capture", "bid", "pipeline", "pursuit", "partnership", "vendor", "client",
            "prospect", "opportunity", "subcontract", "award", "compliance", "agency",
            "gsa", "far", "dfars", "b&p", "gov&edu",
        ],
    },
    CategoryDef {
        category: Category::HumanResources,
        phrases: &[
            "performance review",
            "job description",
            "offer letter",
            "employee handbook",
            "disciplinary action",
            "exit interview",
            "paid time off",
        ],
        words: &[
            "hr", "employee", "onboarding", "offboarding", "payroll", "benefits", "pto",
            "recruiting", "recruiter", "candidate", "interview", "hiring", "termination",
            "promotion", "headcount", "compensation", "harassment", "grievance", "policy",
            "handbook", "timesheet", "workplace",
        ],
    },
    CategoryDef {
        category: Category::AccountingFinance,
        phrases: &[
            "balance sheet",
            "income statement",
            "cash flow",
            "accounts payable",
            "accounts receivable",
            "general ledger",
            "profit and loss",
        ],
        words: &[
            "invoice", "ledger", "accrual", "depreciation", "reconciliation", "audit",
            "budget", "forecast", "expense", "revenue", "tax", "payroll", "accounting",
            "accountant", "finance", "financial", "asset", "liability", "equity", "gaap",
            "amortization", "variance", "p&l",
        ],
    },
];
