//! Catalog of tool identifiers the backend understands.

/// One selectable tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolEntry {
    pub id: &'static str,
    pub label: &'static str,
}

/// Tools grouped for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolGroup {
    pub name: &'static str,
    pub tools: &'static [ToolEntry],
}

const fn tool(id: &'static str, label: &'static str) -> ToolEntry {
    ToolEntry { id, label }
}

pub const TOOL_CATALOG: &[ToolGroup] = &[
    ToolGroup {
        name: "Core",
        tools: &[
            tool("get_current_time", "Current time"),
            tool("python_executor", "Python"),
        ],
    },
    ToolGroup {
        name: "Memory",
        tools: &[
            tool("remember_this", "Remember"),
            tool("recall_memory", "Recall"),
        ],
    },
    ToolGroup {
        name: "File System",
        tools: &[
            tool("list_files", "List files"),
            tool("read_file", "Read file"),
            tool("write_file", "Write file"),
        ],
    },
    ToolGroup {
        name: "Web Research",
        tools: &[
            tool("web_search", "Web search Single"),
            tool("multi_web_search", "Web search Multiple"),
            tool("intelligent_web_reader", "Intelligent web reader"),
            tool("summarize_urls", "Summarize URLs"),
        ],
    },
    ToolGroup {
        name: "Interactive Browser",
        tools: &[
            tool("open_url", "Open URL"),
            tool("click_element", "Click element"),
            tool("type_text", "Type text"),
            tool("list_interactive_elements", "List interactive elements"),
            tool("close_browser", "Close browser"),
        ],
    },
];

/// Every catalog id in display order; the default enabled set for a turn.
pub fn all_tool_ids() -> Vec<String> {
    TOOL_CATALOG
        .iter()
        .flat_map(|group| group.tools.iter())
        .map(|entry| entry.id.to_string())
        .collect()
}

pub fn is_known_tool(id: &str) -> bool {
    TOOL_CATALOG
        .iter()
        .flat_map(|group| group.tools.iter())
        .any(|entry| entry.id == id)
}
