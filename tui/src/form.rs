use slide_protocol::{GenerationRequest, Tone, MAX_SLIDES, MIN_SLIDES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Topic,
    Audience,
    Tone,
    Slides,
}

impl Field {
    const ORDER: [Field; 4] = [Field::Topic, Field::Audience, Field::Tone, Field::Slides];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Topic => "Topic",
            Field::Audience => "Audience",
            Field::Tone => "Tone",
            Field::Slides => "Slides",
        }
    }

    fn offset(self, by: isize) -> Field {
        let len = Self::ORDER.len() as isize;
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0) as isize;
        Self::ORDER[(idx + by).rem_euclid(len) as usize]
    }
}

/// Editable copy of the request shown on the form screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub topic: String,
    pub audience: String,
    pub tone: Tone,
    pub slide_count: u8,
    pub focus: Field,
}

impl FormState {
    pub fn from_request(request: &GenerationRequest) -> Self {
        Self {
            topic: request.topic.clone(),
            audience: request.audience.clone(),
            tone: request.tone,
            slide_count: request.slide_count.clamp(MIN_SLIDES, MAX_SLIDES),
            focus: Field::Topic,
        }
    }

    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest::new(
            self.topic.clone(),
            self.audience.clone(),
            self.tone,
            self.slide_count,
        )
    }

    /// Submit is offered only when both text fields have content.
    pub fn is_complete(&self) -> bool {
        !self.topic.trim().is_empty() && !self.audience.trim().is_empty()
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.offset(1);
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.offset(-1);
    }

    pub fn insert_char(&mut self, c: char) {
        match self.focus {
            Field::Topic => self.topic.push(c),
            Field::Audience => self.audience.push(c),
            Field::Tone => {}
            Field::Slides => match c {
                '+' => self.step(1),
                '-' => self.step(-1),
                _ => {}
            },
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            Field::Topic => {
                self.topic.pop();
            }
            Field::Audience => {
                self.audience.pop();
            }
            Field::Tone | Field::Slides => {}
        }
    }

    /// Left/right on a choice field.
    pub fn step(&mut self, by: i8) {
        match self.focus {
            Field::Tone if by > 0 => self.tone = self.tone.next(),
            Field::Tone if by < 0 => self.tone = self.tone.previous(),
            Field::Slides => {
                let next = i16::from(self.slide_count) + i16::from(by);
                let clamped = next.clamp(i16::from(MIN_SLIDES), i16::from(MAX_SLIDES));
                self.slide_count = u8::try_from(clamped).unwrap_or(self.slide_count);
            }
            _ => {}
        }
    }
}
