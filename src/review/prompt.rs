// SPDX-License-Identifier: MIT
//! The review prompt.
//!
//! One fixed template; the diff is embedded verbatim, unescaped and
//! untruncated. Oversized diffs are bounded only by the model's context
//! window — the request fails at the API rather than being silently cut.

/// Build the single user message sent to the completion endpoint.
pub fn build_prompt(diff: &str) -> String {
    format!(
        r#"You are an expert senior software engineer and code reviewer.

Analyze the following Git Diff from a new commit.
Identify any problems or potential issues including logic errors, security risks, performance issues, bad patterns, code smells, or missing checks.

For each issue, provide:
1. Explanation
2. Why it is a problem
3. Suggested fix
4. Which lines of the diff are affected

The diff is below:

{diff}

Return your response in strict JSON using this structure:

{{
  "issues": [
    {{
      "title": "",
      "explanation": "",
      "reason": "",
      "suggested_fix": "",
      "lines": ""
    }}
  ]
}}"#
    )
}
