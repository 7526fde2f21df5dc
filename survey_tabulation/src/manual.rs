/*!

This is the long-form manual for `survey_tabulation` and `pollboard`.

## Input formats

The following response-file providers are supported:
* `json` Flat JSON arrays of records
* `csv` Comma Separated Values
* `xlsx` Excel spreadsheets

### `json`

An array of flat objects, one per respondent. Values may be strings, numbers
or `null`:

```text
[
  {"PF1": "Feminino", "P1": "Aprova", "peso": 1.2},
  {"PF1": "Masculino", "P1": "#null!", "peso": 0.8}
]
```

### `csv`

The first row carries the variable keys, every following row is one
respondent:

```text
PF1,P1,peso
Feminino,Aprova,1.2
Masculino,#null!,0.8
```

Cells that parse as numbers are read as numbers; empty cells are read as
missing. The weight column is optional (records without one weigh 1).

### `xlsx`

Same layout as `csv`, read from the first worksheet unless
`excelWorksheetName` selects another one.

## Variable naming

Question variables are keyed `P<digits>` (`P1`, `P23`), demographic
variables `PF<digits>` (`PF1`). A question whose label appears in two or
more survey rounds is *historic* and is aggregated as a time series; a
label appearing in exactly one round is *unique* and is aggregated as a
single distribution.

## Non-answers

Empty cells, empty strings, `#null!` and the locale sentinels
("não sabe", "não respondeu", with or without diacritics) never count as
answers: the respondent leaves both the numerator and the denominator for
that question. The configuration can extend the sentinel list with
`extraNonAnswers`.

## Configuration

`pollboard` accepts a configuration file in JSON:

```text
{
  "outputSettings": {"dashboardName": "Pesquisa Nacional"},
  "surveys": [
    {"id": "s1", "month": "Janeiro", "year": 2023,
     "variables": [{"key": "P1", "label": "Avaliação do governo"},
                   {"key": "PF1", "label": "Sexo"}]}
  ],
  "responseFileSources": [
    {"provider": "csv", "filePath": "responses_2023_01.csv", "surveyId": "s1"}
  ],
  "selection": {"kind": "historic", "label": "Avaliação do governo"},
  "filters": {"PF1": ["Feminino"]},
  "dateRange": {"start": "2023-01-01", "end": "2023-12-01"},
  "weightColumn": "peso"
}
```

Notes:
- `selection.key` is optional: when absent, the key is resolved from the
  label through the question catalog.
- `filters` maps demographic keys to allow-lists. An empty list imposes no
  constraint.
- `dateRange` bounds are inclusive and either side may be omitted. Only the
  year and month of the dates are significant (rounds are first-of-month).
- `comparison` (optional) requests a side-by-side table:
  `{"demographic": "PF1", "values": ["Feminino", "Masculino"]}`. When
  `values` is omitted, the first two observed values are compared.

## Margin of error

Every report carries the conservative 95%-confidence margin
(`1.96 * sqrt(0.25 / n) * 100`) for the filtered sample. Margins above 10
percentage points are flagged and logged as warnings; nothing is gated.

 */
