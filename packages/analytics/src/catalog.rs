//! The fixed question battery.
//!
//! Each method issues one grouped read against the store, ranks the
//! groups and shapes the answer. All methods are read-only and may run
//! concurrently with each other and with writes.

use std::sync::Arc;

use crime_insights_analytics_models::{
    Answer, GroupCount, GroupKey, GroupValue, HourCount, MethodShare, MonthCount, OffenseCount,
    PsaCount, Question, QuestionResponse, ShiftCount, TemporalFeature, WardCount, WeekdayCount,
    Weekday, DEFAULT_OFFENSE_YEAR,
};
use crime_insights_database::IncidentStore;
use crime_insights_database_models::{IncidentFilter, Predicate};
use crime_insights_incident_models::IncidentField;

use crate::AnalyticsError;
use crate::proportion::proportions;
use crate::ranking::{rank, top};

/// Number of offenses returned by [`QueryCatalog::top_offenses`].
pub const TOP_OFFENSE_LIMIT: usize = 5;

/// Answers the crime question battery against an injected store.
#[derive(Clone)]
pub struct QueryCatalog {
    store: Arc<dyn IncidentStore>,
}

impl std::fmt::Debug for QueryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCatalog").finish_non_exhaustive()
    }
}

impl QueryCatalog {
    /// Creates a catalog that reads from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn IncidentStore>) -> Self {
        Self { store }
    }

    async fn grouped(
        &self,
        filter: IncidentFilter,
        key: GroupKey,
    ) -> Result<Vec<GroupCount>, AnalyticsError> {
        let groups = self.store.aggregate(&filter, key).await?;
        log::debug!("grouped by {key}: {} groups", groups.len());
        Ok(groups)
    }

    async fn top_group(
        &self,
        filter: IncidentFilter,
        key: GroupKey,
    ) -> Result<Option<GroupCount>, AnalyticsError> {
        Ok(top(self.grouped(filter, key).await?))
    }

    /// The five most frequent offenses reported in `year`.
    ///
    /// # Errors
    ///
    /// * If the store read fails
    pub async fn top_offenses(&self, year: i32) -> Result<Vec<OffenseCount>, AnalyticsError> {
        let groups = self
            .grouped(
                IncidentFilter::all().with(Predicate::ReportedInYear(year)),
                GroupKey::Field(IncidentField::Offense),
            )
            .await?;

        Ok(rank(groups, Some(TOP_OFFENSE_LIMIT))
            .into_iter()
            .map(|g| OffenseCount {
                offense: g.key.label(),
                count: g.count,
            })
            .collect())
    }

    /// The weekday with the most reports.
    ///
    /// # Errors
    ///
    /// * If the store read fails
    /// * If the store returns a day index outside `0..=6`
    pub async fn most_common_weekday(&self) -> Result<Option<WeekdayCount>, AnalyticsError> {
        let Some(group) = self
            .top_group(
                IncidentFilter::all().with(Predicate::ReportedPresent),
                GroupKey::Feature(TemporalFeature::DayOfWeek),
            )
            .await?
        else {
            return Ok(None);
        };

        let index = number(&group.key)?;
        let weekday = Weekday::from_index(index).ok_or_else(|| AnalyticsError::Conversion {
            message: format!("day of week out of range: {index}"),
        })?;

        Ok(Some(WeekdayCount {
            weekday,
            count: group.count,
        }))
    }

    /// The hour of day with the most reports.
    ///
    /// # Errors
    ///
    /// * If the store read fails
    pub async fn busiest_hour(&self) -> Result<Option<HourCount>, AnalyticsError> {
        self.top_group(
            IncidentFilter::all().with(Predicate::ReportedPresent),
            GroupKey::Feature(TemporalFeature::Hour),
        )
        .await?
        .map(|g| {
            Ok(HourCount {
                hour: number(&g.key)?,
                count: g.count,
            })
        })
        .transpose()
    }

    /// The ward with the most incidents.
    ///
    /// # Errors
    ///
    /// * If the store read fails
    pub async fn top_ward(&self) -> Result<Option<WardCount>, AnalyticsError> {
        Ok(self
            .top_group(
                IncidentFilter::all().with(Predicate::Present(IncidentField::Ward)),
                GroupKey::Field(IncidentField::Ward),
            )
            .await?
            .map(|g| WardCount {
                ward: g.key.label(),
                count: g.count,
            }))
    }

    /// The PSA with the most incidents.
    ///
    /// # Errors
    ///
    /// * If the store read fails
    pub async fn top_psa(&self) -> Result<Option<PsaCount>, AnalyticsError> {
        Ok(self
            .top_group(
                IncidentFilter::all().with(Predicate::Present(IncidentField::Psa)),
                GroupKey::Field(IncidentField::Psa),
            )
            .await?
            .map(|g| PsaCount {
                psa: g.key.label(),
                count: g.count,
            }))
    }

    /// Every method with its share of all incidents, most common first.
    ///
    /// Incidents without a method count toward `UNKNOWN`.
    ///
    /// # Errors
    ///
    /// * If the store read fails
    pub async fn method_fractions(&self) -> Result<Vec<MethodShare>, AnalyticsError> {
        let groups = rank(
            self.grouped(IncidentFilter::all(), GroupKey::Field(IncidentField::Method))
                .await?,
            None,
        );

        Ok(proportions(&groups)
            .into_iter()
            .map(|share| MethodShare {
                method: share.key.label(),
                count: share.count,
                percent: share.percent,
            })
            .collect())
    }

    /// Every shift with its incident count, most common first.
    ///
    /// # Errors
    ///
    /// * If the store read fails
    pub async fn shift_comparison(&self) -> Result<Vec<ShiftCount>, AnalyticsError> {
        let groups = self
            .grouped(IncidentFilter::all(), GroupKey::Field(IncidentField::Shift))
            .await?;

        Ok(rank(groups, None)
            .into_iter()
            .map(|g| ShiftCount {
                shift: g.key.label(),
                count: g.count,
            })
            .collect())
    }

    /// The calendar month with the most reports.
    ///
    /// # Errors
    ///
    /// * If the store read fails
    pub async fn top_month(&self) -> Result<Option<MonthCount>, AnalyticsError> {
        self.top_group(
            IncidentFilter::all().with(Predicate::ReportedPresent),
            GroupKey::Feature(TemporalFeature::Month),
        )
        .await?
        .map(|g| {
            Ok(MonthCount {
                month: number(&g.key)?,
                count: g.count,
            })
        })
        .transpose()
    }

    /// Answers a single question. `year` is only used by
    /// [`Question::TopOffenses`] and defaults to [`DEFAULT_OFFENSE_YEAR`].
    ///
    /// # Errors
    ///
    /// * If the underlying query fails
    pub async fn answer(
        &self,
        question: Question,
        year: Option<i32>,
    ) -> Result<QuestionResponse, AnalyticsError> {
        let year = year.unwrap_or(DEFAULT_OFFENSE_YEAR);
        log::debug!("answer: question={question} year={year}");

        let answer = match question {
            Question::TopOffenses => Answer::TopOffenses(self.top_offenses(year).await?),
            Question::MostCommonWeekday => {
                Answer::MostCommonWeekday(self.most_common_weekday().await?)
            }
            Question::BusiestHour => Answer::BusiestHour(self.busiest_hour().await?),
            Question::TopWard => Answer::TopWard(self.top_ward().await?),
            Question::TopPsa => Answer::TopPsa(self.top_psa().await?),
            Question::MethodFractions => Answer::MethodFractions(self.method_fractions().await?),
            Question::ShiftComparison => Answer::ShiftComparison(self.shift_comparison().await?),
            Question::TopMonth => Answer::TopMonth(self.top_month().await?),
        };

        Ok(QuestionResponse {
            question: question.text(year),
            answer,
        })
    }

    /// Answers every question in catalog order.
    ///
    /// # Errors
    ///
    /// * If any underlying query fails
    pub async fn answer_all(&self) -> Result<Vec<QuestionResponse>, AnalyticsError> {
        let mut responses = Vec::with_capacity(Question::all().len());
        for question in Question::all() {
            responses.push(self.answer(*question, None).await?);
        }
        Ok(responses)
    }
}

fn number(value: &GroupValue) -> Result<i32, AnalyticsError> {
    value.as_number().ok_or_else(|| AnalyticsError::Conversion {
        message: format!("expected a numeric group, got {value:?}"),
    })
}
