use shared::protocol::{KeyButton, Keyboard};
use telemetry::Metric;

use self::Button::{Action as Act, Back};
use crate::commands::{spec_for, Action};

const BACK_ICON: &str = "⬅️";
const BACK_LABEL: &str = "Back";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuView {
    Main,
    Monitor,
    Ops,
    Install,
    Uninstall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Action(Action),
    Back(MenuView),
}

impl Button {
    pub fn target(self) -> Action {
        match self {
            Button::Action(action) => action,
            Button::Back(view) => Action::Show(view),
        }
    }
}

impl MenuView {
    pub const ALL: [MenuView; 5] = [
        MenuView::Main,
        MenuView::Monitor,
        MenuView::Ops,
        MenuView::Install,
        MenuView::Uninstall,
    ];

    pub fn text(self) -> &'static str {
        match self {
            MenuView::Main => "*Host admin bot*\nChoose a module:",
            MenuView::Monitor => "*Monitoring*\nPick a metric:",
            MenuView::Ops => "*Ops panel*",
            MenuView::Install => "*Install tools*",
            MenuView::Uninstall => "*Uninstall tools*",
        }
    }

    pub fn parent(self) -> Option<MenuView> {
        match self {
            MenuView::Main => None,
            MenuView::Monitor | MenuView::Ops => Some(MenuView::Main),
            MenuView::Install | MenuView::Uninstall => Some(MenuView::Ops),
        }
    }

    pub fn layout(self) -> &'static [&'static [Button]] {
        match self {
            MenuView::Main => &[
                &[Act(Action::Show(MenuView::Monitor)), Act(Action::Show(MenuView::Ops))],
                &[Act(Action::Help)],
            ],
            MenuView::Monitor => &[
                &[Act(Action::Status), Act(Action::Metric(Metric::Cpu))],
                &[Act(Action::Metric(Metric::Memory)), Act(Action::Metric(Metric::Disk))],
                &[Act(Action::Metric(Metric::Uptime))],
                &[Back(MenuView::Main)],
            ],
            MenuView::Ops => &[
                &[Act(Action::UpdateSystem)],
                &[Act(Action::Show(MenuView::Install)), Act(Action::Show(MenuView::Uninstall))],
                &[Back(MenuView::Main)],
            ],
            MenuView::Install => &[
                &[Act(Action::InstallTools), Act(Action::ListTools)],
                &[Back(MenuView::Ops)],
            ],
            MenuView::Uninstall => &[
                &[Act(Action::UninstallTools), Act(Action::ListUninstall)],
                &[Back(MenuView::Ops)],
            ],
        }
    }

    pub fn buttons(self) -> impl Iterator<Item = Button> {
        self.layout().iter().flat_map(|row| row.iter().copied())
    }

    pub fn keyboard(self) -> Keyboard {
        Keyboard {
            rows: self
                .layout()
                .iter()
                .map(|row| row.iter().filter_map(|button| key_button(*button)).collect())
                .collect(),
        }
    }
}

fn key_button(button: Button) -> Option<KeyButton> {
    let spec = spec_for(button.target())?;
    let (icon, label) = match button {
        Button::Action(_) => (spec.icon, spec.label),
        Button::Back(_) => (BACK_ICON, BACK_LABEL),
    };
    Some(KeyButton {
        icon: icon.into(),
        label: label.into(),
        command: spec.command().into(),
        callback_id: spec.callback_id.into(),
    })
}
