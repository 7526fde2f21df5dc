/*!

# Quick start

This example walks through tabulating a small two-round tracking poll from
CSV exports.

**Laying out the data** Collect one response file per survey round. The
first row names the variables: demographic keys (`PF1`, ...), question keys
(`P1`, ...) and the weight column.

`responses_2023_01.csv`:

```text
PF1,P1,peso
Feminino,Aprova,2
Masculino,Desaprova,1
```

`responses_2023_03.csv`:

```text
PF1,P1,peso
Feminino,Aprova,1
Masculino,Desaprova,3
```

**Describing the rounds** Write a configuration file declaring the survey
rounds, their variables and where the responses live:

```text
{
  "outputSettings": {"dashboardName": "Pesquisa Nacional"},
  "surveys": [
    {"id": "s1", "month": "Janeiro", "year": 2023,
     "variables": [{"key": "PF1", "label": "Sexo"},
                   {"key": "P1", "label": "Avaliação do governo"}]},
    {"id": "s2", "month": "Março", "year": 2023,
     "variables": [{"key": "PF1", "label": "Sexo"},
                   {"key": "P1", "label": "Avaliação do governo"}]}
  ],
  "responseFileSources": [
    {"provider": "csv", "filePath": "responses_2023_01.csv", "surveyId": "s1"},
    {"provider": "csv", "filePath": "responses_2023_03.csv", "surveyId": "s2"}
  ],
  "selection": {"kind": "historic", "label": "Avaliação do governo"}
}
```

The label "Avaliação do governo" appears in both rounds, so the question is
*historic* and is aggregated as a time series.

**Running** Point `pollboard` at the configuration:

```bash
pollboard --config pesquisa_config.json --out summary.json
```

You should see the weighted shares per round in the logs:

```text
[INFO  survey_tabulation] run_question_stats: Historic "Avaliação do governo" (0 filter keys)
[INFO  pollboard::report] round Janeiro/2023: 2 answers, n=4
[INFO  pollboard::report] round Março/2023: 2 answers, n=4
```

and `summary.json` holds the dense series (one point per round per answer)
together with the margin of error for the filtered sample.

**Filtering** Add demographic allow-lists and an inclusive date window to
the configuration:

```text
"filters": {"PF1": ["Feminino"]},
"dateRange": {"start": "2023-01-01", "end": "2023-06-01"}
```

The margin of error is recomputed for the filtered subset; thin subsets
(margin above 10 points) are flagged in the summary and logged as warnings.

**Exporting** `--export-csv results.csv` writes the same aggregation result
as CSV, one header row plus one row per date (time series) or per answer
(distribution), ready for a spreadsheet.

 */
