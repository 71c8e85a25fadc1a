use linqmenu_core::{
    model::MenuDay,
    scheduler::PollOutcome,
    sensor::MenuSensor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Days,
    DayDetail,
    Attributes,
}

pub(crate) struct App {
    pub sensor: MenuSensor,
    pub title: String,

    pub screen: Screen,
    pub day_index: usize,
    pub attribute_offset: usize,

    pub polls: usize,
    pub is_loading: bool,
}

impl App {
    pub(crate) fn new(sensor: MenuSensor, title: String) -> Self {
        Self {
            sensor,
            title,
            screen: Screen::Days,
            day_index: 0,
            attribute_offset: 0,
            polls: 0,
            is_loading: true,
        }
    }

    pub(crate) fn apply(&mut self, outcome: PollOutcome) {
        self.sensor.apply(outcome);
        self.polls += 1;
        self.is_loading = false;

        let days = self.days().len();
        if self.day_index >= days {
            self.day_index = days.saturating_sub(1);
        }
    }

    pub(crate) fn days(&self) -> &[MenuDay] {
        self.sensor
            .snapshot()
            .map(|snapshot| snapshot.menus.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn selected_day(&self) -> Option<&MenuDay> {
        self.days().get(self.day_index)
    }

    pub(crate) fn open_selected_day(&mut self) {
        if self.selected_day().is_some() {
            self.screen = Screen::DayDetail;
        }
    }
}
