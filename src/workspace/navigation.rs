//! The opened item: which input or output is shown full size

use super::outputs::OutputId;
use super::Workspace;

/// Which list an item lives in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Area {
    Input,
    Output,
}

/// Item shown in the viewer. Inputs are addressed by position, outputs by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opened {
    Input(usize),
    Output(OutputId),
}

impl Workspace {
    pub fn opened(&self) -> Option<Opened> {
        self.opened
    }

    /// Open an item if it exists. Returns whether the viewer changed.
    pub fn open(&mut self, index: i64, area: Area) -> bool {
        let opened = match area {
            Area::Input => usize::try_from(index)
                .ok()
                .filter(|&i| i < self.inputs.len())
                .map(Opened::Input),
            Area::Output => self.outputs.contains(index).then_some(Opened::Output(index)),
        };
        match opened {
            Some(opened) => {
                self.opened = Some(opened);
                true
            }
            None => false,
        }
    }

    pub fn close(&mut self) {
        self.opened = None;
    }

    /// Step towards older outputs or later inputs
    pub fn right(&mut self) {
        match self.opened {
            Some(Opened::Output(id)) => self.step_output(id, 1),
            Some(Opened::Input(index)) => {
                if index + 1 < self.inputs.len() {
                    self.opened = Some(Opened::Input(index + 1));
                }
            }
            None => {}
        }
    }

    /// Step towards newer outputs or earlier inputs
    pub fn left(&mut self) {
        match self.opened {
            Some(Opened::Output(id)) => self.step_output(id, -1),
            Some(Opened::Input(index)) => {
                if index > 0 {
                    self.opened = Some(Opened::Input(index - 1));
                }
            }
            None => {}
        }
    }

    fn step_output(&mut self, id: OutputId, delta: i64) {
        let Some(index) = self.outputs.id_to_index(id) else {
            return;
        };
        if let Some(next) = self.outputs.index_to_id(index as i64 + delta) {
            self.opened = Some(Opened::Output(next));
        }
    }

    /// Delete the opened item and show its neighbour
    pub fn delete_opened(&mut self) {
        match self.opened {
            Some(Opened::Output(id)) => {
                let index = self.outputs.id_to_index(id).map_or(-1, |i| i as i64);
                self.delete_output(id);
                if self.outputs.is_empty() {
                    self.close();
                    return;
                }
                // Prefer the newer neighbour, then the one that slid into place
                let next = self
                    .outputs
                    .index_to_id(index - 1)
                    .or_else(|| self.outputs.index_to_id(index));
                if let Some(next) = next {
                    self.opened = Some(Opened::Output(next));
                }
            }
            Some(Opened::Input(index)) => {
                self.delete_input(index);
                if self.inputs.is_empty() {
                    self.close();
                    return;
                }
                let prev = index.saturating_sub(1).min(self.inputs.len() - 1);
                self.opened = Some(Opened::Input(prev));
            }
            None => {}
        }
    }

    /// Whether the newest output is open, so new results should take its place
    pub fn is_sticky(&self) -> bool {
        match self.opened {
            Some(Opened::Output(id)) => self.outputs.id_to_index(id) == Some(0),
            _ => false,
        }
    }
}
