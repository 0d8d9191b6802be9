use std::collections::HashMap;

use telemetry::Metric;

use crate::menu::MenuView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Show(MenuView),
    Help,
    Status,
    Metric(Metric),
    UpdateSystem,
    InstallTools,
    ListTools,
    UninstallTools,
    ListUninstall,
}

/// One row of the dispatch table. `commands[0]` is the canonical command
/// used on reply keyboards; the rest are aliases.
#[derive(Debug)]
pub struct CommandSpec {
    pub commands: &'static [&'static str],
    pub callback_id: &'static str,
    pub icon: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub action: Action,
}

impl CommandSpec {
    pub fn command(&self) -> &'static str {
        self.commands[0]
    }
}

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        commands: &["/start", "/back"],
        callback_id: "menu_main",
        icon: "🏠",
        label: "Main menu",
        description: "main menu",
        action: Action::Show(MenuView::Main),
    },
    CommandSpec {
        commands: &["/help"],
        callback_id: "help",
        icon: "❓",
        label: "Help",
        description: "list commands",
        action: Action::Help,
    },
    CommandSpec {
        commands: &["/monitor"],
        callback_id: "menu_monitor",
        icon: "📈",
        label: "Monitor",
        description: "monitoring panel",
        action: Action::Show(MenuView::Monitor),
    },
    CommandSpec {
        commands: &["/ops"],
        callback_id: "menu_ops",
        icon: "🛠️",
        label: "Ops",
        description: "ops panel",
        action: Action::Show(MenuView::Ops),
    },
    CommandSpec {
        commands: &["/install"],
        callback_id: "menu_install",
        icon: "📦",
        label: "Install",
        description: "install menu",
        action: Action::Show(MenuView::Install),
    },
    CommandSpec {
        commands: &["/uninstall"],
        callback_id: "menu_uninstall",
        icon: "🗑️",
        label: "Uninstall",
        description: "uninstall menu",
        action: Action::Show(MenuView::Uninstall),
    },
    CommandSpec {
        commands: &["/status"],
        callback_id: "mon_status",
        icon: "📊",
        label: "Status",
        description: "all metrics at once",
        action: Action::Status,
    },
    CommandSpec {
        commands: &["/cpu"],
        callback_id: "mon_cpu",
        icon: "🧮",
        label: "CPU",
        description: "cpu usage",
        action: Action::Metric(Metric::Cpu),
    },
    CommandSpec {
        commands: &["/mem"],
        callback_id: "mon_mem",
        icon: "🧠",
        label: "Memory",
        description: "memory usage",
        action: Action::Metric(Metric::Memory),
    },
    CommandSpec {
        commands: &["/disk"],
        callback_id: "mon_disk",
        icon: "💾",
        label: "Disk",
        description: "disk usage of /",
        action: Action::Metric(Metric::Disk),
    },
    CommandSpec {
        commands: &["/uptime"],
        callback_id: "mon_uptime",
        icon: "⏱️",
        label: "Uptime",
        description: "host uptime",
        action: Action::Metric(Metric::Uptime),
    },
    CommandSpec {
        commands: &["/update"],
        callback_id: "ops_update",
        icon: "🔄",
        label: "Update system",
        description: "refresh and upgrade packages",
        action: Action::UpdateSystem,
    },
    CommandSpec {
        commands: &["/install_tools"],
        callback_id: "ops_install_tools",
        icon: "✅",
        label: "Install tools",
        description: "install base tools",
        action: Action::InstallTools,
    },
    CommandSpec {
        commands: &["/list_tools"],
        callback_id: "ops_list_tools",
        icon: "📋",
        label: "List tools",
        description: "show install tools list",
        action: Action::ListTools,
    },
    CommandSpec {
        commands: &["/uninstall_tools"],
        callback_id: "ops_uninstall_tools",
        icon: "🗑️",
        label: "Uninstall tools",
        description: "uninstall base tools",
        action: Action::UninstallTools,
    },
    CommandSpec {
        commands: &["/list_uninstall"],
        callback_id: "ops_list_uninstall",
        icon: "📋",
        label: "List tools",
        description: "show uninstall tools list",
        action: Action::ListUninstall,
    },
];

pub fn spec_for(action: Action) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.action == action)
}

/// Text and callback lookup built once from the static command list.
///
/// A command literal matches when the trimmed text equals it or continues
/// with whitespace or `@` (as in `/status@my_bot`). Literals are tried
/// longest first, so overlapping names resolve deterministically.
#[derive(Debug)]
pub struct CommandTable {
    literals: Vec<(&'static str, Action)>,
    callbacks: HashMap<&'static str, Action>,
}

impl CommandTable {
    pub fn new(specs: &'static [CommandSpec]) -> Self {
        let mut literals: Vec<(&'static str, Action)> = specs
            .iter()
            .flat_map(|spec| spec.commands.iter().map(move |cmd| (*cmd, spec.action)))
            .collect();
        literals.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let callbacks = specs
            .iter()
            .map(|spec| (spec.callback_id, spec.action))
            .collect();

        Self {
            literals,
            callbacks,
        }
    }

    pub fn builtin() -> Self {
        Self::new(COMMANDS)
    }

    pub fn resolve_text(&self, text: &str) -> Option<Action> {
        let text = text.trim();
        self.literals
            .iter()
            .find(|(literal, _)| matches_command(text, literal))
            .map(|(_, action)| *action)
    }

    pub fn resolve_callback(&self, action_id: &str) -> Option<Action> {
        self.callbacks.get(action_id).copied()
    }

    pub fn literals(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.literals.iter().map(|(literal, _)| *literal)
    }
}

fn matches_command(text: &str, literal: &str) -> bool {
    match text.strip_prefix(literal) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace) || rest.starts_with('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_followed_by_arguments_matches() {
        let table = CommandTable::builtin();
        assert_eq!(table.resolve_text("/status extra text"), Some(Action::Status));
        assert_eq!(table.resolve_text("  /status  "), Some(Action::Status));
        assert_eq!(table.resolve_text("/status\tnow"), Some(Action::Status));
        assert_eq!(table.resolve_text("/status@host_bot"), Some(Action::Status));
    }

    #[test]
    fn prefix_glued_to_other_text_does_not_match() {
        let table = CommandTable::builtin();
        assert_eq!(table.resolve_text("/statusx"), None);
        assert_eq!(table.resolve_text("/cpuinfo"), None);
        assert_eq!(table.resolve_text("status"), None);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let table = CommandTable::builtin();
        assert_eq!(table.resolve_text("/STATUS"), None);
        assert_eq!(table.resolve_text("/Cpu"), None);
    }

    #[test]
    fn overlapping_literals_pick_the_specific_command() {
        let table = CommandTable::builtin();
        assert_eq!(table.resolve_text("/install"), Some(Action::Show(MenuView::Install)));
        assert_eq!(table.resolve_text("/install_tools"), Some(Action::InstallTools));
        assert_eq!(table.resolve_text("/uninstall"), Some(Action::Show(MenuView::Uninstall)));
        assert_eq!(table.resolve_text("/uninstall_tools"), Some(Action::UninstallTools));
    }

    #[test]
    fn reply_button_text_resolves_to_its_command() {
        let table = CommandTable::builtin();
        assert_eq!(table.resolve_text("/monitor 📈"), Some(Action::Show(MenuView::Monitor)));
        assert_eq!(table.resolve_text("/back ⬅️"), Some(Action::Show(MenuView::Main)));
    }

    #[test]
    fn literals_are_ordered_longest_first() {
        let table = CommandTable::builtin();
        let lengths: Vec<usize> = table.literals().map(str::len).collect();
        assert!(lengths.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn callbacks_resolve_exactly() {
        let table = CommandTable::builtin();
        assert_eq!(table.resolve_callback("menu_main"), Some(Action::Show(MenuView::Main)));
        assert_eq!(table.resolve_callback("mon_cpu"), Some(Action::Metric(Metric::Cpu)));
        assert_eq!(table.resolve_callback("menu_main "), None);
        assert_eq!(table.resolve_callback("nope"), None);
    }

    #[test]
    fn every_spec_has_unique_commands_and_callbacks() {
        let mut commands: Vec<&str> = COMMANDS.iter().flat_map(|s| s.commands.iter().copied()).collect();
        let total = commands.len();
        commands.sort_unstable();
        commands.dedup();
        assert_eq!(commands.len(), total);

        let mut callbacks: Vec<&str> = COMMANDS.iter().map(|s| s.callback_id).collect();
        callbacks.sort_unstable();
        callbacks.dedup();
        assert_eq!(callbacks.len(), COMMANDS.len());
    }

    #[test]
    fn command_surface_is_complete() {
        let table = CommandTable::builtin();
        for command in [
            "/start", "/help", "/monitor", "/ops", "/status", "/cpu", "/mem", "/disk",
            "/uptime", "/update", "/install_tools",
        ] {
            assert!(table.resolve_text(command).is_some(), "{command} should resolve");
        }
    }
}
